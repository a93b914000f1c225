use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors produced when a nanosecond count cannot be formatted.
#[derive(Debug, Error, PartialEq)]
pub enum DurationError {
	#[error("Cannot format a negative duration ({0}ns)")]
	Negative(f64),

	#[error("Cannot format a non-finite duration ({0})")]
	NotFinite(f64),

	#[error("Duration of {0}ns is too large to be formatted")]
	OutOfRange(f64),
}

/// The kinds of errors that can occur while loading, denormalizing or serializing a config.
#[derive(Debug, Error)]
pub enum SerializeError {
	// Contract violations
	#[error("Unsupported compose file version `{0}`")]
	UnsupportedVersion(String),

	#[error("Invalid healthcheck `{field}` for service `{service}`: {source}")]
	Duration {
		service: String,
		field: &'static str,
		source: DurationError,
	},

	// I/O errors
	#[error("Could not read the contents of `{path}`: {source}")]
	ReadError { path: PathBuf, source: io::Error },

	#[error("Failed to create or write to the file `{path}`: {source}")]
	WriteError { path: PathBuf, source: io::Error },

	// Serde errors
	#[error("Could not deserialize file `{0:?}` due to an unsupported extension. Allowed extensions are: yaml, yml, json")]
	UnsupportedExtension(PathBuf),

	#[error("Error while deserializing the contents of `{file:?}`: {error}")]
	DeserializationError { file: PathBuf, error: String },
}
