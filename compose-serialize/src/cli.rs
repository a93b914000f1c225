use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::{
	ImageDigests, NormalizedConfig, SerializeError, SerializeOptions,
	fs::{deserialize_file, write_file},
	serialize_config,
};

#[derive(Parser, Debug, Clone)]
#[command(name = "compose-serialize")]
#[command(version, about, long_about = None)]
pub struct Cli {
	/// The normalized config to serialize (yaml, yml or json)
	pub input: PathBuf,

	/// A yaml or json mapping of service names to the image reference that should replace their `image`
	#[arg(long, value_name = "FILE")]
	pub image_digests: Option<PathBuf>,

	/// Writes `$` as it is, instead of escaping it as `$$`
	#[arg(long)]
	pub no_escape_dollar: bool,

	/// Sorts the keys of every mapping
	#[arg(long)]
	pub sort_keys: bool,

	/// The output file [default: stdout]
	#[arg(short, long)]
	pub output: Option<PathBuf>,
}

fn init_tracing() {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
		.with_writer(std::io::stderr)
		.init();
}

pub fn main_entrypoint() -> Result<(), SerializeError> {
	init_tracing();

	Cli::parse().execute()
}

impl Cli {
	fn options(&self) -> SerializeOptions {
		SerializeOptions {
			escape_dollar: !self.no_escape_dollar,
			sort_keys: self.sort_keys,
		}
	}

	pub fn execute(self) -> Result<(), SerializeError> {
		let config: NormalizedConfig = deserialize_file(&self.input)?;

		tracing::debug!(
			input = %self.input.display(),
			version = %config.version,
			services = config.services.len(),
			"Loaded config"
		);

		let digests: Option<ImageDigests> = self
			.image_digests
			.as_deref()
			.map(deserialize_file)
			.transpose()?;

		let output = serialize_config(&config, digests.as_ref(), &self.options())?;

		match &self.output {
			Some(path) => write_file(path, &output)?,
			None => print!("{output}"),
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn verify_cli() {
		Cli::command().debug_assert();
	}

	#[test]
	fn flags_map_onto_options() {
		let cli = Cli::try_parse_from([
			"compose-serialize",
			"--no-escape-dollar",
			"--sort-keys",
			"-o",
			"out.yaml",
			"compose.json",
		])
		.unwrap();

		assert_eq!(cli.input, PathBuf::from("compose.json"));
		assert_eq!(cli.output, Some(PathBuf::from("out.yaml")));
		assert_eq!(
			cli.options(),
			SerializeOptions {
				escape_dollar: false,
				sort_keys: true,
			}
		);

		let cli = Cli::try_parse_from(["compose-serialize", "compose.yaml"]).unwrap();
		assert_eq!(cli.options(), SerializeOptions::default());
		assert_eq!(cli.image_digests, None);
	}
}
