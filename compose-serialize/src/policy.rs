//! Which keys each file format version understands.
//!
//! The rules for the top-level resource groups are kept in [`RESOURCE_RULES`], a table keyed by
//! attribute, resource kind and version range. Service-level rules only need to know whether a
//! version falls in one of the windows defined here.

use serde_json::Value;

use crate::{ComposeVersion, ResourceEntry};

/// The oldest supported version. Files in this version are written out as [`OLDEST_UPGRADE`].
pub const OLDEST: ComposeVersion = ComposeVersion::V1;
pub const OLDEST_UPGRADE: ComposeVersion = ComposeVersion::V2_1;

/// `depends_on` accepts conditions from here until [`CONDITIONS_DROPPED`].
pub const CONDITIONAL_DEPENDS_ON: ComposeVersion = ComposeVersion::V2_1;
pub const CONDITIONS_DROPPED: ComposeVersion = ComposeVersion::V3_0;

/// First version with the long port syntax.
pub const LONG_PORT_SYNTAX: ComposeVersion = ComposeVersion::V3_2;

/// First version whose short volume syntax accepts the options the long syntax can express.
pub const SHORT_VOLUME_OPTIONS: ComposeVersion = ComposeVersion::V2_3;

/// First version where networks can be `attachable`.
pub const NETWORK_ATTACHABLE: ComposeVersion = ComposeVersion::V3_2;

/// First v3 version with a `name` key for volumes; the other kinds got it one version later.
pub const V3_VOLUME_NAME: ComposeVersion = ComposeVersion::V3_4;
pub const V3_RESOURCE_NAME: ComposeVersion = ComposeVersion::V3_5;

/// A half-open range of versions. A missing bound is unbounded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VersionRange {
	pub from: Option<ComposeVersion>,
	pub until: Option<ComposeVersion>,
}

impl VersionRange {
	pub const ALL: Self = Self {
		from: None,
		until: None,
	};

	pub const fn before(version: ComposeVersion) -> Self {
		Self {
			from: None,
			until: Some(version),
		}
	}

	pub const fn starting(version: ComposeVersion) -> Self {
		Self {
			from: Some(version),
			until: None,
		}
	}

	pub const fn between(from: ComposeVersion, until: ComposeVersion) -> Self {
		Self {
			from: Some(from),
			until: Some(until),
		}
	}

	pub fn contains(&self, version: ComposeVersion) -> bool {
		self.from.is_none_or(|from| version >= from) && self.until.is_none_or(|until| version < until)
	}
}

fn in_any(ranges: &[VersionRange], version: ComposeVersion) -> bool {
	ranges.iter().any(|range| range.contains(version))
}

/// Versions where `depends_on` must be a plain list of service names.
pub const DEPENDS_ON_AS_LIST: [VersionRange; 2] = [
	VersionRange::before(CONDITIONAL_DEPENDS_ON),
	VersionRange::starting(CONDITIONS_DROPPED),
];

/// Versions where ports must use the short syntax.
pub const LEGACY_PORTS: VersionRange = VersionRange::before(LONG_PORT_SYNTAX);

/// Versions where long syntax mounts must be written in the short syntax. 3.1 lost support for
/// the long syntax that 3.0 briefly had.
pub const LEGACY_MOUNTS: [VersionRange; 2] = [
	VersionRange::before(SHORT_VOLUME_OPTIONS),
	VersionRange::between(ComposeVersion::V3_1, LONG_PORT_SYNTAX),
];

/// The version written in the `version` header.
pub fn header_version(version: ComposeVersion) -> ComposeVersion {
	if version == OLDEST {
		OLDEST_UPGRADE
	} else {
		version
	}
}

pub fn defaults_network_mode(version: ComposeVersion) -> bool {
	version == OLDEST
}

pub fn depends_on_as_list(version: ComposeVersion) -> bool {
	in_any(&DEPENDS_ON_AS_LIST, version)
}

pub fn ports_use_legacy(version: ComposeVersion) -> bool {
	LEGACY_PORTS.contains(version)
}

pub fn mounts_use_legacy(version: ComposeVersion) -> bool {
	in_any(&LEGACY_MOUNTS, version)
}

/// The top-level resource groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
	Networks,
	Volumes,
	Secrets,
	Configs,
}

impl ResourceKind {
	/// All kinds, in the order they are written.
	pub const ALL: [Self; 4] = [Self::Networks, Self::Volumes, Self::Secrets, Self::Configs];

	pub const fn key(self) -> &'static str {
		match self {
			Self::Networks => "networks",
			Self::Volumes => "volumes",
			Self::Secrets => "secrets",
			Self::Configs => "configs",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Treatment {
	/// Remove the attribute.
	Drop,
	/// Replace the attribute with its truthiness.
	CoerceToBool,
}

/// One row of [`RESOURCE_RULES`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeRule {
	pub attribute: &'static str,
	pub kinds: &'static [ResourceKind],
	pub versions: VersionRange,
	/// Another attribute that must still be present for the rule to apply.
	pub requires: Option<&'static str>,
	pub treatment: Treatment,
}

const ALL_KINDS: &[ResourceKind] = &ResourceKind::ALL;

/// Rules for the entries of the top-level resource groups, applied in order.
pub const RESOURCE_RULES: &[AttributeRule] = &[
	AttributeRule {
		attribute: "external_name",
		kinds: ALL_KINDS,
		versions: VersionRange::ALL,
		requires: None,
		treatment: Treatment::Drop,
	},
	AttributeRule {
		attribute: "name",
		kinds: ALL_KINDS,
		versions: VersionRange::before(ComposeVersion::V2_1),
		requires: None,
		treatment: Treatment::Drop,
	},
	AttributeRule {
		attribute: "name",
		kinds: &[ResourceKind::Volumes],
		versions: VersionRange::between(ComposeVersion::V3_0, V3_VOLUME_NAME),
		requires: None,
		treatment: Treatment::Drop,
	},
	AttributeRule {
		attribute: "name",
		kinds: &[ResourceKind::Networks, ResourceKind::Secrets, ResourceKind::Configs],
		versions: VersionRange::between(ComposeVersion::V3_0, V3_RESOURCE_NAME),
		requires: None,
		treatment: Treatment::Drop,
	},
	AttributeRule {
		attribute: "external",
		kinds: ALL_KINDS,
		versions: VersionRange::ALL,
		requires: Some("name"),
		treatment: Treatment::CoerceToBool,
	},
	AttributeRule {
		attribute: "attachable",
		kinds: ALL_KINDS,
		versions: VersionRange::before(NETWORK_ATTACHABLE),
		requires: None,
		treatment: Treatment::Drop,
	},
];

impl AttributeRule {
	pub fn applies_to(&self, kind: ResourceKind, version: ComposeVersion) -> bool {
		self.kinds.contains(&kind) && self.versions.contains(version)
	}
}

/// The rules relevant to a resource kind in a given version, in application order.
pub fn resource_rules(
	kind: ResourceKind,
	version: ComposeVersion,
) -> impl Iterator<Item = &'static AttributeRule> {
	RESOURCE_RULES
		.iter()
		.filter(move |rule| rule.applies_to(kind, version))
}

/// The truthiness of a JSON value: `null`, `false`, zero and empty values are false.
pub fn is_truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
		Value::String(s) => !s.is_empty(),
		Value::Array(a) => !a.is_empty(),
		Value::Object(o) => !o.is_empty(),
	}
}

/// Applies the resource rules to one entry, in place.
pub fn apply_resource_rules(kind: ResourceKind, version: ComposeVersion, entry: &mut ResourceEntry) {
	for rule in resource_rules(kind, version) {
		if !entry.contains_key(rule.attribute) {
			continue;
		}

		if rule.requires.is_some_and(|required| !entry.contains_key(required)) {
			continue;
		}

		match rule.treatment {
			Treatment::Drop => {
				entry.shift_remove(rule.attribute);
			}
			Treatment::CoerceToBool => {
				if let Some(value) = entry.get_mut(rule.attribute) {
					*value = Value::Bool(is_truthy(value));
				}
			}
		}

		tracing::trace!(
			kind = kind.key(),
			attribute = rule.attribute,
			treatment = ?rule.treatment,
			%version,
			"Applied resource rule"
		);
	}
}

#[cfg(test)]
mod tests {
	use indexmap::IndexMap;
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;

	fn entry(value: Value) -> ResourceEntry {
		serde_json::from_value(value).unwrap()
	}

	#[test]
	fn service_windows() {
		use ComposeVersion as V;

		let list: Vec<V> = V::ALL.into_iter().filter(|v| depends_on_as_list(*v)).collect();
		assert_eq!(
			list,
			[V::V1, V::V2_0, V::V3_0, V::V3_1, V::V3_2, V::V3_3, V::V3_4, V::V3_5, V::V3_6, V::V3_7, V::V3_8]
		);

		let legacy_mounts: Vec<V> = V::ALL.into_iter().filter(|v| mounts_use_legacy(*v)).collect();
		assert_eq!(legacy_mounts, [V::V1, V::V2_0, V::V2_1, V::V2_2, V::V3_1]);

		assert!(ports_use_legacy(V::V3_1));
		assert!(!ports_use_legacy(V::V3_2));

		assert_eq!(header_version(V::V1), V::V2_1);
		assert_eq!(header_version(V::V2_0), V::V2_0);
		assert!(defaults_network_mode(V::V1));
		assert!(!defaults_network_mode(V::V2_0));
	}

	#[test]
	fn external_name_always_dropped() {
		for version in ComposeVersion::ALL {
			for kind in ResourceKind::ALL {
				let mut e = entry(json!({ "external_name": "legacy", "driver": "overlay" }));
				apply_resource_rules(kind, version, &mut e);
				assert!(!e.contains_key("external_name"), "{kind:?} {version}");
				assert!(e.contains_key("driver"));
			}
		}
	}

	#[test]
	fn name_key_depends_on_kind_and_version() {
		let kept = |kind, version| {
			let mut e = entry(json!({ "name": "custom" }));
			apply_resource_rules(kind, version, &mut e);
			e.contains_key("name")
		};

		assert!(!kept(ResourceKind::Networks, ComposeVersion::V1));
		assert!(!kept(ResourceKind::Volumes, ComposeVersion::V2_0));
		assert!(kept(ResourceKind::Networks, ComposeVersion::V2_1));
		assert!(kept(ResourceKind::Volumes, ComposeVersion::V2_4));
		assert!(!kept(ResourceKind::Volumes, ComposeVersion::V3_3));
		assert!(kept(ResourceKind::Volumes, ComposeVersion::V3_4));
		assert!(!kept(ResourceKind::Secrets, ComposeVersion::V3_4));
		assert!(kept(ResourceKind::Secrets, ComposeVersion::V3_5));
		assert!(!kept(ResourceKind::Configs, ComposeVersion::V3_0));
		assert!(kept(ResourceKind::Networks, ComposeVersion::V3_8));
	}

	#[test]
	fn external_is_coerced_only_when_name_survives() {
		let mut e = entry(json!({ "name": "shared", "external": { "name": "shared" } }));
		apply_resource_rules(ResourceKind::Networks, ComposeVersion::V3_5, &mut e);
		assert_eq!(e.get("external"), Some(&json!(true)));

		let mut e = entry(json!({ "name": "shared", "external": { "name": "shared" } }));
		apply_resource_rules(ResourceKind::Networks, ComposeVersion::V3_4, &mut e);
		assert_eq!(e.get("external"), Some(&json!({ "name": "shared" })));
		assert!(!e.contains_key("name"));

		let mut e: ResourceEntry = IndexMap::new();
		e.insert("name".to_string(), json!("x"));
		e.insert("external".to_string(), json!({}));
		apply_resource_rules(ResourceKind::Volumes, ComposeVersion::V2_1, &mut e);
		assert_eq!(e.get("external"), Some(&json!(false)));
	}

	#[test]
	fn attachable_dropped_before_it_existed() {
		let mut e = entry(json!({ "attachable": true }));
		apply_resource_rules(ResourceKind::Networks, ComposeVersion::V3_1, &mut e);
		assert!(e.is_empty());

		let mut e = entry(json!({ "attachable": true }));
		apply_resource_rules(ResourceKind::Networks, ComposeVersion::V3_2, &mut e);
		assert_eq!(e.get("attachable"), Some(&json!(true)));
	}

	#[test]
	fn truthiness() {
		assert!(!is_truthy(&json!(null)));
		assert!(!is_truthy(&json!(0)));
		assert!(!is_truthy(&json!("")));
		assert!(!is_truthy(&json!([])));
		assert!(is_truthy(&json!(1.5)));
		assert!(is_truthy(&json!({ "name": "x" })));
	}
}
