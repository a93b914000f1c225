//! Writes normalized docker compose configurations back out as YAML, in the shape expected by the
//! file format version they declare.
//!
//! A [`NormalizedConfig`] is turned into a plain [`serde_yaml_ng::Mapping`] by
//! [`denormalize_config`], which applies the rules in [`policy`], and then written by the [`emit`]
//! module. Healthcheck durations are formatted with the compact codec in [`duration`].
//!
//! ```
//! use compose_serialize::{
//! 	ComposeVersion, NormalizedConfig, SerializeOptions, ServiceRecord, serialize_config,
//! };
//!
//! let mut config = NormalizedConfig::new(ComposeVersion::V3_8);
//! config.services.push(ServiceRecord {
//! 	name: "web".to_string(),
//! 	image: Some("nginx".to_string()),
//! 	..Default::default()
//! });
//!
//! let output = serialize_config(&config, None, &SerializeOptions::default()).unwrap();
//!
//! assert_eq!(output, "version: '3.8'\nservices:\n  web:\n    image: nginx\n");
//! ```

use serde_yaml_ng::Value;

pub mod denormalize;
pub mod duration;
pub mod emit;
pub mod errors;
pub mod fs;
pub mod policy;
pub mod present;
pub mod types;
pub mod version;

pub mod cli;

pub use denormalize::*;
pub use duration::*;
pub use emit::EmitterOptions;
pub use errors::*;
pub use present::{Present, PresentMode, Presentation, PresentedScalar, ScalarStyle, present_str};
pub use types::*;
pub use version::*;

/// Options for [`serialize_config`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SerializeOptions {
	/// Doubles every `$` in the output strings.
	pub escape_dollar: bool,
	pub sort_keys: bool,
}

impl Default for SerializeOptions {
	fn default() -> Self {
		Self {
			escape_dollar: true,
			sort_keys: false,
		}
	}
}

impl SerializeOptions {
	pub fn emitter_options(&self) -> EmitterOptions {
		EmitterOptions {
			mode: if self.escape_dollar {
				PresentMode::EscapeDollar
			} else {
				PresentMode::Plain
			},
			sort_keys: self.sort_keys,
			..Default::default()
		}
	}
}

/// Denormalizes a config for its own version and writes it as a YAML document.
pub fn serialize_config(
	config: &NormalizedConfig,
	image_digests: Option<&ImageDigests>,
	options: &SerializeOptions,
) -> Result<String, SerializeError> {
	let document = denormalize_config(config, image_digests)?;

	let output = emit::to_string(&Value::Mapping(document), &options.emitter_options());

	tracing::trace!(
		services = config.services.len(),
		bytes = output.len(),
		"Serialized config"
	);

	Ok(output)
}
