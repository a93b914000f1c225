use std::{
	fs::File,
	io::Write,
	path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;

use crate::SerializeError;

pub fn read_file(path: &Path) -> Result<File, SerializeError> {
	File::open(path).map_err(|e| SerializeError::ReadError {
		path: path.to_path_buf(),
		source: e,
	})
}

pub fn deserialize_json<T: DeserializeOwned>(path: &Path) -> Result<T, SerializeError> {
	let file = read_file(path)?;

	serde_json::from_reader(file).map_err(|e| SerializeError::DeserializationError {
		file: path.to_path_buf(),
		error: e.to_string(),
	})
}

pub fn deserialize_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, SerializeError> {
	let file = read_file(path)?;

	serde_yaml_ng::from_reader(file).map_err(|e| SerializeError::DeserializationError {
		file: path.to_path_buf(),
		error: e.to_string(),
	})
}

/// Deserializes a yaml or json file, picking the format from its extension.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, SerializeError> {
	let extension = path
		.extension()
		.and_then(|e| e.to_str())
		.unwrap_or_default();

	match extension {
		"yaml" | "yml" => deserialize_yaml(path),
		"json" => deserialize_json(path),
		_ => Err(SerializeError::UnsupportedExtension(PathBuf::from(path))),
	}
}

pub fn write_file(path: &Path, content: &str) -> Result<(), SerializeError> {
	let mut file = File::create(path).map_err(|e| SerializeError::WriteError {
		path: path.to_path_buf(),
		source: e,
	})?;

	file
		.write_all(content.as_bytes())
		.map_err(|e| SerializeError::WriteError {
			path: path.to_path_buf(),
			source: e,
		})
}
