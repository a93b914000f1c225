use indexmap::IndexMap;
use serde_yaml_ng::{Mapping, Value};

use crate::{
	ComposeVersion, NormalizedConfig, SerializeError, ServiceRecord, ServiceVolume,
	duration::Nanoseconds,
	policy::{
		ResourceKind, apply_resource_rules, defaults_network_mode, depends_on_as_list,
		header_version, mounts_use_legacy, ports_use_legacy,
	},
	present::{Present, json_to_yaml},
};

/// Image references that replace the `image` of the service with the same name.
pub type ImageDigests = IndexMap<String, String>;

fn format_duration(
	service: &str,
	field: &'static str,
	value: Nanoseconds,
) -> Result<Value, SerializeError> {
	value
		.format()
		.map(Value::String)
		.map_err(|source| SerializeError::Duration {
			service: service.to_string(),
			field,
			source,
		})
}

/// Turns a normalized service into the shape expected by `version`.
///
/// The result still carries the service's `name`.
pub fn denormalize_service(
	service: &ServiceRecord,
	version: ComposeVersion,
	image_digest: Option<&str>,
) -> Result<Mapping, SerializeError> {
	let mut map = Mapping::new();

	map.insert("name".into(), service.name.as_str().into());

	if let Some(image) = image_digest
		.filter(|digest| !digest.is_empty())
		.or(service.image.as_deref())
	{
		map.insert("image".into(), image.into());
	}

	if let Some(restart) = &service.restart {
		map.insert("restart".into(), restart.to_yaml_value());
	}

	match &service.network_mode {
		Some(mode) => {
			map.insert("network_mode".into(), mode.as_str().into());
		}
		None if defaults_network_mode(version) => {
			map.insert("network_mode".into(), "bridge".into());
		}
		None => {}
	}

	if let Some(depends_on) = &service.depends_on {
		let value = if depends_on_as_list(version) {
			let mut names: Vec<&String> = depends_on.keys().collect();
			names.sort();

			Value::Sequence(names.into_iter().map(|name| name.as_str().into()).collect())
		} else {
			Value::Mapping(
				depends_on
					.iter()
					.map(|(name, settings)| (name.as_str().into(), settings.to_yaml_value()))
					.collect(),
			)
		};

		map.insert("depends_on".into(), value);
	}

	if let Some(healthcheck) = &service.healthcheck {
		let mut check: Mapping = healthcheck
			.extra
			.iter()
			.map(|(k, v)| (k.as_str().into(), json_to_yaml(v)))
			.collect();

		for (field, value) in [
			("interval", healthcheck.interval),
			("timeout", healthcheck.timeout),
			("start_period", healthcheck.start_period),
		] {
			if let Some(value) = value {
				check.insert(field.into(), format_duration(&service.name, field, value)?);
			}
		}

		map.insert("healthcheck".into(), Value::Mapping(check));
	}

	if let Some(ports) = &service.ports {
		let legacy_only = ports_use_legacy(version);

		let ports = ports
			.iter()
			.map(|port| {
				let has_external_ip = port.external_ip.as_deref().is_some_and(|ip| !ip.is_empty());

				if has_external_ip || legacy_only {
					Value::String(port.legacy_repr())
				} else {
					port.to_yaml_value()
				}
			})
			.collect();

		map.insert("ports".into(), Value::Sequence(ports));
	}

	if let Some(volumes) = &service.volumes {
		let legacy_mounts = mounts_use_legacy(version);

		let volumes = volumes
			.iter()
			.map(|volume| match volume {
				ServiceVolume::Mount(mount) if legacy_mounts => Value::String(mount.legacy_repr()),
				other => other.to_yaml_value(),
			})
			.collect();

		map.insert("volumes".into(), Value::Sequence(volumes));
	}

	if let Some(volumes_from) = &service.volumes_from {
		map.insert("volumes_from".into(), presented_list(volumes_from));
	}

	if let Some(security_opt) = &service.security_opt {
		map.insert("security_opt".into(), presented_list(security_opt));
	}

	if let Some(secrets) = &service.secrets {
		map.insert("secrets".into(), presented_list(secrets));
	}

	if let Some(configs) = &service.configs {
		map.insert("configs".into(), presented_list(configs));
	}

	for (key, value) in &service.extra {
		map.insert(key.as_str().into(), json_to_yaml(value));
	}

	Ok(map)
}

fn presented_list<T: Present>(items: &[T]) -> Value {
	Value::Sequence(items.iter().map(Present::to_yaml_value).collect())
}

/// Builds the whole document for the config's own version.
///
/// Services are keyed by name, in their original order. Resource groups are only written when
/// they have entries.
pub fn denormalize_config(
	config: &NormalizedConfig,
	image_digests: Option<&ImageDigests>,
) -> Result<Mapping, SerializeError> {
	let version = config.version;
	let mut result = Mapping::new();

	result.insert("version".into(), header_version(version).as_str().into());

	let mut services = Mapping::new();

	for service in &config.services {
		let digest = image_digests
			.and_then(|digests| digests.get(&service.name))
			.map(String::as_str);

		let denormalized = denormalize_service(service, version, digest)?;

		let body: Mapping = denormalized
			.into_iter()
			.filter(|(key, _)| key.as_str() != Some("name"))
			.collect();

		tracing::debug!(
			service = %service.name,
			%version,
			image_override = digest.is_some(),
			"Denormalized service"
		);

		services.insert(service.name.as_str().into(), Value::Mapping(body));
	}

	result.insert("services".into(), Value::Mapping(services));

	for kind in ResourceKind::ALL {
		let group = config.resources(kind);

		if group.is_empty() {
			continue;
		}

		let mut entries = Mapping::new();

		for (name, entry) in group {
			let mut entry = entry.clone();
			apply_resource_rules(kind, version, &mut entry);

			let entry: Mapping = entry
				.iter()
				.map(|(k, v)| (k.as_str().into(), json_to_yaml(v)))
				.collect();

			entries.insert(name.as_str().into(), Value::Mapping(entry));
		}

		tracing::debug!(kind = kind.key(), entries = entries.len(), "Denormalized resource group");

		result.insert(kind.key().into(), Value::Mapping(entries));
	}

	Ok(result)
}

#[cfg(test)]
mod tests {
	use maplit::btreemap;
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;
	use crate::{
		DependsOnCondition, DependsOnSettings, Healthcheck, MountSpec, MountType, RestartSpec,
		ServicePort, StringOrNum, VolumeSpec,
	};

	fn depends(condition: DependsOnCondition) -> DependsOnSettings {
		DependsOnSettings {
			condition,
			restart: None,
			required: None,
		}
	}

	fn web() -> ServiceRecord {
		ServiceRecord {
			name: "web".to_string(),
			image: Some("nginx:1.25".to_string()),
			..Default::default()
		}
	}

	fn get<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
		map.get(key)
	}

	#[test]
	fn input_is_left_untouched() {
		let service = ServiceRecord {
			restart: Some(RestartSpec {
				name: "always".to_string(),
				maximum_retry_count: 0,
			}),
			..web()
		};
		let before = service.clone();

		denormalize_service(&service, ComposeVersion::V1, Some("nginx@sha256:abc")).unwrap();

		assert_eq!(service, before);
	}

	#[test]
	fn image_digest_overrides_image() {
		let out = denormalize_service(&web(), ComposeVersion::V3_8, Some("nginx@sha256:abc")).unwrap();
		assert_eq!(get(&out, "image"), Some(&Value::from("nginx@sha256:abc")));

		let out = denormalize_service(&web(), ComposeVersion::V3_8, None).unwrap();
		assert_eq!(get(&out, "image"), Some(&Value::from("nginx:1.25")));
	}

	#[test]
	fn network_mode_defaults_only_for_oldest_version() {
		let out = denormalize_service(&web(), ComposeVersion::V1, None).unwrap();
		assert_eq!(get(&out, "network_mode"), Some(&Value::from("bridge")));

		let out = denormalize_service(&web(), ComposeVersion::V2_0, None).unwrap();
		assert_eq!(get(&out, "network_mode"), None);

		let host = ServiceRecord {
			network_mode: Some("host".to_string()),
			..web()
		};
		let out = denormalize_service(&host, ComposeVersion::V1, None).unwrap();
		assert_eq!(get(&out, "network_mode"), Some(&Value::from("host")));
	}

	#[test]
	fn depends_on_shape_follows_version() {
		let service = ServiceRecord {
			depends_on: Some(IndexMap::from_iter([
				("redis".to_string(), depends(DependsOnCondition::ServiceStarted)),
				("db".to_string(), depends(DependsOnCondition::ServiceHealthy)),
			])),
			..web()
		};

		let as_list = Value::Sequence(vec!["db".into(), "redis".into()]);

		for version in [ComposeVersion::V2_0, ComposeVersion::V3_0, ComposeVersion::V3_8] {
			let out = denormalize_service(&service, version, None).unwrap();
			assert_eq!(get(&out, "depends_on"), Some(&as_list), "{version}");
		}

		let out = denormalize_service(&service, ComposeVersion::V2_1, None).unwrap();
		let Some(Value::Mapping(conditions)) = get(&out, "depends_on") else {
			panic!("conditions should be kept in 2.1");
		};

		let keys: Vec<&str> = conditions.keys().filter_map(Value::as_str).collect();
		assert_eq!(keys, ["redis", "db"]);
		assert_eq!(
			conditions.get("db").and_then(|d| d.get("condition")),
			Some(&Value::from("service_healthy"))
		);
	}

	#[test]
	fn healthcheck_durations_are_formatted() {
		let service = ServiceRecord {
			healthcheck: Some(Healthcheck {
				interval: Some(Nanoseconds::Whole(30_000_000_000)),
				timeout: Some(Nanoseconds::Fractional(1.01e8)),
				start_period: Some(Nanoseconds::Whole(90_000_000_000)),
				extra: IndexMap::from_iter([("retries".to_string(), json!(3))]),
			}),
			..web()
		};

		let out = denormalize_service(&service, ComposeVersion::V3_4, None).unwrap();
		let check = get(&out, "healthcheck").unwrap();

		assert_eq!(check.get("interval"), Some(&Value::from("30s")));
		assert_eq!(check.get("timeout"), Some(&Value::from("101ms")));
		assert_eq!(check.get("start_period"), Some(&Value::from("90s")));
		assert_eq!(check.get("retries"), Some(&Value::from(3u64)));
	}

	#[test]
	fn negative_durations_reject_the_service() {
		let service = ServiceRecord {
			healthcheck: Some(Healthcheck {
				interval: Some(Nanoseconds::Fractional(-5.0)),
				..Default::default()
			}),
			..web()
		};

		let err = denormalize_service(&service, ComposeVersion::V3_4, None).unwrap_err();
		assert!(matches!(
			err,
			SerializeError::Duration { ref service, field: "interval", .. } if service == "web"
		));
	}

	#[test]
	fn ports_use_short_syntax_when_required() {
		let service = ServiceRecord {
			ports: Some(vec![
				ServicePort {
					target: StringOrNum::Num(80),
					published: Some(StringOrNum::Num(8080)),
					protocol: Some("tcp".to_string()),
					mode: Some("ingress".to_string()),
					external_ip: None,
				},
				ServicePort {
					target: StringOrNum::Num(443),
					published: Some(StringOrNum::Num(8443)),
					protocol: None,
					mode: None,
					external_ip: Some("127.0.0.1".to_string()),
				},
			]),
			..web()
		};

		let out = denormalize_service(&service, ComposeVersion::V3_1, None).unwrap();
		assert_eq!(
			get(&out, "ports"),
			Some(&Value::Sequence(vec![
				"8080:80/tcp".into(),
				"127.0.0.1:8443:443/tcp".into()
			]))
		);

		let out = denormalize_service(&service, ComposeVersion::V3_2, None).unwrap();
		let Some(Value::Sequence(ports)) = get(&out, "ports") else {
			panic!("ports should be a list");
		};
		assert!(ports[0].is_mapping());
		assert_eq!(ports[0].get("published"), Some(&Value::from(8080u64)));
		assert_eq!(ports[1], Value::from("127.0.0.1:8443:443/tcp"));
	}

	#[test]
	fn mounts_use_short_syntax_in_legacy_windows() {
		let mount = MountSpec {
			type_: MountType::Bind,
			source: Some("./src".to_string()),
			target: "/app".to_string(),
			read_only: Some(true),
			consistency: None,
			options: IndexMap::new(),
		};

		let service = ServiceRecord {
			volumes: Some(vec![
				ServiceVolume::Mount(mount),
				ServiceVolume::Spec(VolumeSpec {
					external: Some("logs".to_string()),
					internal: "/var/log".to_string(),
					mode: "rw".to_string(),
				}),
				ServiceVolume::Raw("/tmp".to_string()),
			]),
			..web()
		};

		let expected_short = Value::Sequence(vec![
			"./src:/app:ro".into(),
			"logs:/var/log:rw".into(),
			"/tmp".into(),
		]);

		let windows = btreemap! {
			ComposeVersion::V2_2 => true,
			ComposeVersion::V2_3 => false,
			ComposeVersion::V3_0 => false,
			ComposeVersion::V3_1 => true,
			ComposeVersion::V3_2 => false,
		};

		for (version, short) in windows {
			let out = denormalize_service(&service, version, None).unwrap();
			let volumes = get(&out, "volumes").unwrap();

			if short {
				assert_eq!(volumes, &expected_short, "{version}");
			} else {
				assert!(volumes[0].is_mapping(), "{version}");
				assert_eq!(volumes[1], Value::from("logs:/var/log:rw"));
			}
		}
	}

	#[test]
	fn config_header_and_service_keys() {
		let mut config = NormalizedConfig::new(ComposeVersion::V1);
		config.services.push(ServiceRecord {
			name: "zeta".to_string(),
			..web()
		});
		config.services.push(web());

		let out = denormalize_config(&config, None).unwrap();

		assert_eq!(get(&out, "version"), Some(&Value::from("2.1")));

		let Some(Value::Mapping(services)) = get(&out, "services") else {
			panic!("services should be a mapping");
		};

		let names: Vec<&str> = services.keys().filter_map(Value::as_str).collect();
		assert_eq!(names, ["zeta", "web"]);

		for (_, body) in services {
			assert_eq!(body.get("name"), None);
			assert_eq!(body.get("network_mode"), Some(&Value::from("bridge")));
		}
	}

	#[test]
	fn digests_are_matched_by_service_name() {
		let mut config = NormalizedConfig::new(ComposeVersion::V3_8);
		config.services.push(web());
		config.services.push(ServiceRecord {
			name: "worker".to_string(),
			image: Some("worker:dev".to_string()),
			..Default::default()
		});

		let digests = ImageDigests::from_iter([("web".to_string(), "nginx@sha256:123".to_string())]);
		let out = denormalize_config(&config, Some(&digests)).unwrap();
		let services = get(&out, "services").unwrap();

		assert_eq!(
			services.get("web").and_then(|s| s.get("image")),
			Some(&Value::from("nginx@sha256:123"))
		);
		assert_eq!(
			services.get("worker").and_then(|s| s.get("image")),
			Some(&Value::from("worker:dev"))
		);
	}

	#[test]
	fn empty_resource_groups_are_omitted() {
		let mut config = NormalizedConfig::new(ComposeVersion::V3_8);
		config.volumes.insert(
			"data".to_string(),
			serde_json::from_value(json!({ "external_name": "old", "driver": "local" })).unwrap(),
		);

		let out = denormalize_config(&config, None).unwrap();

		let keys: Vec<&str> = out.keys().filter_map(Value::as_str).collect();
		assert_eq!(keys, ["version", "services", "volumes"]);

		let data = out.get("volumes").and_then(|v| v.get("data")).unwrap();
		assert_eq!(data.get("external_name"), None);
		assert_eq!(data.get("driver"), Some(&Value::from("local")));

		assert_eq!(config.volumes["data"].get("external_name"), Some(&json!("old")));
	}

	#[test]
	fn denormalization_is_deterministic() {
		let mut config = NormalizedConfig::new(ComposeVersion::V2_1);
		config.services.push(web());
		config.networks.insert(
			"front".to_string(),
			serde_json::from_value(json!({ "name": "front", "external": { "name": "front" } })).unwrap(),
		);

		let first = denormalize_config(&config, None).unwrap();
		let second = denormalize_config(&config, None).unwrap();
		assert_eq!(first, second);

		assert_eq!(
			first.get("networks").and_then(|n| n.get("front")).and_then(|f| f.get("external")),
			Some(&Value::Bool(true))
		);
	}
}
