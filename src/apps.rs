//! Installed applications.
//!
//! Every application exposes an [`AppConfig`]; the project keeps the list in
//! [`installed_apps`], which drives migrations and the `check` command.

pub mod polls;

use crate::db::migrations::Migration;

/// Static description of an installed application.
#[derive(Debug, Clone, Copy)]
pub struct AppConfig {
	/// Dotted module path of the application.
	pub name: &'static str,
	/// Short label, used as the migration namespace and table prefix.
	pub label: &'static str,
	pub verbose_name: &'static str,
	/// Migrations owned by the application, oldest first.
	pub migrations: fn() -> Vec<Migration>,
}

/// Applications that make up the project, in dependency order.
pub fn installed_apps() -> Vec<AppConfig> {
	vec![polls::CONFIG]
}

/// Migrations of every installed application, in application order.
pub fn migrations() -> Vec<Migration> {
	installed_apps()
		.iter()
		.flat_map(|app| (app.migrations)())
		.collect()
}

/// Look up an installed application by label.
pub fn get_app_config(label: &str) -> Option<AppConfig> {
	installed_apps().into_iter().find(|app| app.label == label)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_polls_is_installed() {
		let app = get_app_config("polls").unwrap();
		assert_eq!(app.verbose_name, "Polls");
		assert!(get_app_config("admin").is_none());
	}

	#[rstest]
	fn test_migrations_belong_to_their_app() {
		let migrations = migrations();
		assert!(!migrations.is_empty());
		assert!(migrations.iter().all(|m| m.app_label == "polls"));
	}
}
