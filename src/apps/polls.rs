//! The polls application: questions, their choices, and voting.

pub mod migrations;
pub mod models;
pub mod serializers;
pub mod urls;
pub mod views;

use super::AppConfig;

pub const APP_LABEL: &str = "polls";

pub const CONFIG: AppConfig = AppConfig {
	name: "polls",
	label: APP_LABEL,
	verbose_name: "Polls",
	migrations: migrations::migrations,
};
