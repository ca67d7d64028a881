//! Logging setup.
//!
//! `RUST_LOG` wins when set; otherwise the filter comes from the settings,
//! raised by the `-v` count of the management command.

use tracing_subscriber::{EnvFilter, fmt};

use crate::config::Settings;

/// Filter directive for `verbosity` on top of `base`.
pub fn filter_directive(base: &str, verbosity: u8) -> String {
	match verbosity {
		0 => base.to_string(),
		1 => "polls=debug,info".to_string(),
		_ => "trace".to_string(),
	}
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(settings: &Settings, verbosity: u8) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(filter_directive(&settings.log_filter, verbosity)));

	let _ = fmt().with_env_filter(filter).with_target(settings.debug).try_init();
}
