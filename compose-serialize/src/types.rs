use std::fmt::{self, Display};

use indexmap::IndexMap;
#[cfg(feature = "schemars")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_yaml_ng::{Mapping, Value as YamlValue};

use crate::{
	ComposeVersion, Nanoseconds,
	policy::ResourceKind,
	present::{Present, Presentation, json_to_yaml},
};

/// The attributes of a top-level network, volume, secret or config.
pub type ResourceEntry = IndexMap<String, Value>;

/// A compose file after schema normalization.
///
/// Services keep the order in which they were declared.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
pub struct NormalizedConfig {
	#[cfg_attr(feature = "schemars", schemars(with = "String"))]
	pub version: ComposeVersion,

	#[serde(default)]
	pub services: Vec<ServiceRecord>,

	#[serde(default, skip_serializing_if = "IndexMap::is_empty")]
	pub networks: IndexMap<String, ResourceEntry>,

	#[serde(default, skip_serializing_if = "IndexMap::is_empty")]
	pub volumes: IndexMap<String, ResourceEntry>,

	#[serde(default, skip_serializing_if = "IndexMap::is_empty")]
	pub secrets: IndexMap<String, ResourceEntry>,

	#[serde(default, skip_serializing_if = "IndexMap::is_empty")]
	pub configs: IndexMap<String, ResourceEntry>,
}

impl NormalizedConfig {
	pub fn new(version: ComposeVersion) -> Self {
		Self {
			version,
			services: Vec::new(),
			networks: IndexMap::new(),
			volumes: IndexMap::new(),
			secrets: IndexMap::new(),
			configs: IndexMap::new(),
		}
	}

	/// The top-level group for the given kind of resource.
	pub const fn resources(&self, kind: ResourceKind) -> &IndexMap<String, ResourceEntry> {
		match kind {
			ResourceKind::Networks => &self.networks,
			ResourceKind::Volumes => &self.volumes,
			ResourceKind::Secrets => &self.secrets,
			ResourceKind::Configs => &self.configs,
		}
	}
}

/// A single normalized service.
///
/// The attributes that change shape between versions are typed; everything else is kept in
/// `extra`, in declaration order, and written out unchanged.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
pub struct ServiceRecord {
	pub name: String,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub image: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub restart: Option<RestartSpec>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub network_mode: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub depends_on: Option<IndexMap<String, DependsOnSettings>>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub healthcheck: Option<Healthcheck>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub ports: Option<Vec<ServicePort>>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub volumes: Option<Vec<ServiceVolume>>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub volumes_from: Option<Vec<VolumeFromSpec>>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub security_opt: Option<Vec<SecurityOpt>>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub secrets: Option<Vec<ServiceSecret>>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub configs: Option<Vec<ServiceConfig>>,

	#[serde(flatten)]
	pub extra: IndexMap<String, Value>,
}

/// The restart policy of a service, in the shape used by the engine API.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
pub struct RestartSpec {
	#[serde(rename = "Name")]
	pub name: String,

	#[serde(rename = "MaximumRetryCount", default)]
	pub maximum_retry_count: u32,
}

impl Present for RestartSpec {
	fn present(&self) -> Presentation {
		if self.maximum_retry_count == 0 {
			Presentation::Short(self.name.clone())
		} else {
			Presentation::Short(format!("{}:{}", self.name, self.maximum_retry_count))
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(rename_all = "snake_case")]
pub enum DependsOnCondition {
	/// Waits until the service has completed successfully.
	ServiceCompletedSuccessfully,
	/// Waits until the service is healthy (as defined by its healthcheck).
	ServiceHealthy,
	/// Waits until the service has started.
	ServiceStarted,
}

impl DependsOnCondition {
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::ServiceCompletedSuccessfully => "service_completed_successfully",
			Self::ServiceHealthy => "service_healthy",
			Self::ServiceStarted => "service_started",
		}
	}
}

/// The condition attached to a dependency.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
pub struct DependsOnSettings {
	/// Condition to wait for.
	pub condition: DependsOnCondition,

	/// Whether to restart dependent services when this service is restarted.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub restart: Option<bool>,

	/// Whether the dependency is required for the dependent service to start.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub required: Option<bool>,
}

impl Present for DependsOnSettings {
	fn present(&self) -> Presentation {
		let mut map = Mapping::new();
		map.insert("condition".into(), self.condition.as_str().into());

		if let Some(restart) = self.restart {
			map.insert("restart".into(), restart.into());
		}

		if let Some(required) = self.required {
			map.insert("required".into(), required.into());
		}

		Presentation::Long(map)
	}
}

/// A normalized healthcheck. Durations are nanosecond counts.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
pub struct Healthcheck {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub interval: Option<Nanoseconds>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub timeout: Option<Nanoseconds>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub start_period: Option<Nanoseconds>,

	/// `test`, `retries`, `disable` and any other key.
	#[serde(flatten)]
	pub extra: IndexMap<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(untagged)]
pub enum StringOrNum {
	Num(u64),
	String(String),
}

impl Display for StringOrNum {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Num(n) => write!(f, "{n}"),
			Self::String(s) => f.write_str(s),
		}
	}
}

impl From<&StringOrNum> for YamlValue {
	fn from(value: &StringOrNum) -> Self {
		match value {
			StringOrNum::Num(n) => Self::from(*n),
			StringOrNum::String(s) => Self::from(s.as_str()),
		}
	}
}

/// A port mapping.
///
/// See more: https://docs.docker.com/reference/compose-file/services/#ports
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
pub struct ServicePort {
	/// The port inside the container.
	pub target: StringOrNum,

	/// The publicly exposed port, or a range of ports.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub published: Option<StringOrNum>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub protocol: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub mode: Option<String>,

	/// The host IP to bind to.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub external_ip: Option<String>,
}

impl ServicePort {
	/// The `[ip:][published:]target/protocol` form accepted by every file format version.
	pub fn legacy_repr(&self) -> String {
		let external_ip = self.external_ip.as_deref().filter(|ip| !ip.is_empty());

		let ip = external_ip.map(|ip| format!("{ip}:")).unwrap_or_default();
		let published = self
			.published
			.as_ref()
			.map(ToString::to_string)
			.unwrap_or_default();
		let separator = if self.published.is_some() || external_ip.is_some() {
			":"
		} else {
			""
		};
		let protocol = self.protocol.as_deref().unwrap_or("tcp");

		format!("{ip}{published}{separator}{}/{protocol}", self.target)
	}
}

impl Present for ServicePort {
	fn present(&self) -> Presentation {
		let mut map = Mapping::new();
		map.insert("target".into(), (&self.target).into());

		if let Some(published) = &self.published {
			map.insert("published".into(), published.into());
		}

		if let Some(protocol) = &self.protocol {
			map.insert("protocol".into(), protocol.as_str().into());
		}

		if let Some(mode) = &self.mode {
			map.insert("mode".into(), mode.as_str().into());
		}

		if let Some(external_ip) = &self.external_ip {
			map.insert("external_ip".into(), external_ip.as_str().into());
		}

		Presentation::Long(map)
	}
}

/// The mount type.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum MountType {
	Bind,
	Volume,
	Tmpfs,
	Npipe,
}

impl MountType {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Bind => "bind",
			Self::Volume => "volume",
			Self::Tmpfs => "tmpfs",
			Self::Npipe => "npipe",
		}
	}
}

/// A volume in its long syntax.
///
/// See more: https://docs.docker.com/reference/compose-file/services/#long-syntax-6
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct MountSpec {
	#[serde(rename = "type")]
	pub type_: MountType,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub source: Option<String>,

	pub target: String,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub read_only: Option<bool>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub consistency: Option<String>,

	/// Options specific to the mount type, written under the key named after it.
	#[serde(default, skip_serializing_if = "IndexMap::is_empty")]
	pub options: IndexMap<String, Value>,
}

impl MountSpec {
	pub fn as_volume_spec(&self) -> VolumeSpec {
		VolumeSpec {
			external: self.source.clone().filter(|s| !s.is_empty()),
			internal: self.target.clone(),
			mode: if self.read_only.unwrap_or(false) { "ro" } else { "rw" }.to_string(),
		}
	}

	/// The short `source:target:mode` syntax.
	pub fn legacy_repr(&self) -> String {
		self.as_volume_spec().to_string()
	}
}

impl Present for MountSpec {
	fn present(&self) -> Presentation {
		let mut map = Mapping::new();
		map.insert("type".into(), self.type_.as_str().into());

		if let Some(source) = self.source.as_deref().filter(|s| !s.is_empty()) {
			map.insert("source".into(), source.into());
		}

		if !self.target.is_empty() {
			map.insert("target".into(), self.target.as_str().into());
		}

		if self.read_only == Some(true) {
			map.insert("read_only".into(), true.into());
		}

		if let Some(consistency) = self.consistency.as_deref().filter(|s| !s.is_empty()) {
			map.insert("consistency".into(), consistency.into());
		}

		if !self.options.is_empty() {
			let options = self
				.options
				.iter()
				.map(|(k, v)| (YamlValue::from(k.as_str()), json_to_yaml(v)))
				.collect();

			map.insert(self.type_.as_str().into(), YamlValue::Mapping(options));
		}

		Presentation::Long(map)
	}
}

/// A volume in the `external:internal:mode` short syntax.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct VolumeSpec {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub external: Option<String>,

	pub internal: String,

	#[serde(default = "default_volume_mode")]
	pub mode: String,
}

fn default_volume_mode() -> String {
	"rw".to_string()
}

impl Display for VolumeSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.external.as_deref().filter(|e| !e.is_empty()) {
			Some(external) => write!(f, "{external}:{}:{}", self.internal, self.mode),
			None => f.write_str(&self.internal),
		}
	}
}

impl Present for VolumeSpec {
	fn present(&self) -> Presentation {
		Presentation::Short(self.to_string())
	}
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum VolumeFromType {
	Service,
	Container,
}

/// A reference to another service or container whose volumes should be mounted.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct VolumeFromSpec {
	pub source: String,

	#[serde(default = "default_volume_mode")]
	pub mode: String,

	#[serde(rename = "type")]
	pub type_: VolumeFromType,
}

impl Present for VolumeFromSpec {
	fn present(&self) -> Presentation {
		let type_ = match self.type_ {
			VolumeFromType::Service => "service",
			VolumeFromType::Container => "container",
		};

		Presentation::Short(format!("{type_}:{}:{}", self.source, self.mode))
	}
}

/// An entry of a service's `volumes`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(untagged)]
pub enum ServiceVolume {
	Mount(MountSpec),
	Spec(VolumeSpec),
	From(VolumeFromSpec),
	Raw(String),
}

impl Present for ServiceVolume {
	fn present(&self) -> Presentation {
		match self {
			Self::Mount(mount) => mount.present(),
			Self::Spec(spec) => spec.present(),
			Self::From(from) => from.present(),
			Self::Raw(raw) => Presentation::Short(raw.clone()),
		}
	}
}

/// A `security_opt` entry. Seccomp profiles loaded from a file keep a reference to it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(untagged)]
pub enum SecurityOpt {
	Raw(String),
	Detailed {
		value: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		src_file: Option<String>,
	},
}

impl Present for SecurityOpt {
	fn present(&self) -> Presentation {
		match self {
			Self::Raw(value)
			| Self::Detailed {
				value,
				src_file: None,
			} => Presentation::Short(value.clone()),
			Self::Detailed {
				src_file: Some(file),
				..
			} => Presentation::Short(format!("seccomp:{file}")),
		}
	}
}

/// A secret granted to a service.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(deny_unknown_fields)]
pub struct ServiceSecret {
	pub source: String,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub target: Option<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub uid: Option<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gid: Option<String>,

	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub mode: Option<u32>,
}

/// A config granted to a service. Same shape as a secret.
pub type ServiceConfig = ServiceSecret;

impl Present for ServiceSecret {
	fn present(&self) -> Presentation {
		let mut map = Mapping::new();
		map.insert("source".into(), self.source.as_str().into());

		for (key, value) in [("target", &self.target), ("uid", &self.uid), ("gid", &self.gid)] {
			if let Some(value) = value {
				map.insert(key.into(), value.as_str().into());
			}
		}

		if let Some(mode) = self.mode {
			map.insert("mode".into(), mode.into());
		}

		Presentation::Long(map)
	}
}
