use std::{
	fmt::{self, Display},
	str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::SerializeError;

/// The historical compose file format versions.
///
/// Variants are declared oldest first, so the derived ordering is the chronological one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComposeVersion {
	V1,
	V2_0,
	V2_1,
	V2_2,
	V2_3,
	V2_4,
	V3_0,
	V3_1,
	V3_2,
	V3_3,
	V3_4,
	V3_5,
	V3_6,
	V3_7,
	V3_8,
}

impl ComposeVersion {
	pub const ALL: [Self; 15] = [
		Self::V1,
		Self::V2_0,
		Self::V2_1,
		Self::V2_2,
		Self::V2_3,
		Self::V2_4,
		Self::V3_0,
		Self::V3_1,
		Self::V3_2,
		Self::V3_3,
		Self::V3_4,
		Self::V3_5,
		Self::V3_6,
		Self::V3_7,
		Self::V3_8,
	];

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::V1 => "1",
			Self::V2_0 => "2.0",
			Self::V2_1 => "2.1",
			Self::V2_2 => "2.2",
			Self::V2_3 => "2.3",
			Self::V2_4 => "2.4",
			Self::V3_0 => "3.0",
			Self::V3_1 => "3.1",
			Self::V3_2 => "3.2",
			Self::V3_3 => "3.3",
			Self::V3_4 => "3.4",
			Self::V3_5 => "3.5",
			Self::V3_6 => "3.6",
			Self::V3_7 => "3.7",
			Self::V3_8 => "3.8",
		}
	}
}

impl Display for ComposeVersion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ComposeVersion {
	type Err = SerializeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let normalized = match s.trim() {
			"2" => "2.0",
			"3" => "3.0",
			other => other,
		};

		Self::ALL
			.into_iter()
			.find(|v| v.as_str() == normalized)
			.ok_or_else(|| SerializeError::UnsupportedVersion(s.to_string()))
	}
}

impl Serialize for ComposeVersion {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

// Accepts both `"3.4"` and bare numbers such as `3.4` or `1`, since YAML sources tend to leave
// the version unquoted.
impl<'de> Deserialize<'de> for ComposeVersion {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Raw {
			String(String),
			Int(u64),
			Float(f64),
		}

		let raw = match Raw::deserialize(deserializer)? {
			Raw::String(s) => s,
			Raw::Int(i) => i.to_string(),
			Raw::Float(f) => format!("{f:.1}"),
		};

		raw.parse().map_err(de::Error::custom)
	}
}
