use clap::{CommandFactory, error::ErrorKind};
use compose_serialize::cli::Cli;

fn main() {
	match compose_serialize::cli::main_entrypoint() {
		Ok(()) => {}
		Err(e) => {
			let mut cmd = Cli::command();
			cmd.error(ErrorKind::InvalidValue, e).exit();
		}
	}
}
