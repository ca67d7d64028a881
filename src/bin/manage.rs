//! Project management entry point (`manage runserver`, `manage migrate`, ...).

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
	match polls::commands::execute_from_command_line().await {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			eprintln!("Error: {}", err);
			ExitCode::FAILURE
		}
	}
}
