//! Project settings.
//!
//! Settings are merged from layered sources in priority order
//! (environment variables > TOML file > defaults), then deserialized into
//! [`Settings`] and validated.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Prefix of environment variables that override settings.
pub const ENV_PREFIX: &str = "POLLS_";

/// Environment variable naming an alternative settings file.
pub const SETTINGS_FILE_ENV: &str = "POLLS_SETTINGS_FILE";

/// Settings file used when [`SETTINGS_FILE_ENV`] is unset.
pub const DEFAULT_SETTINGS_FILE: &str = "settings/base.toml";

/// Error type for loading settings
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("Failed to read {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Invalid setting: {0}")]
	Invalid(String),
}

/// Runtime configuration of the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	pub debug: bool,
	pub database_url: String,
	pub bind_address: String,
	/// Number of questions listed on the index page.
	pub index_page_size: i64,
	/// `tracing` filter used when `RUST_LOG` is unset.
	pub log_filter: String,
	/// Redirect `/path` to `/path/` when only the latter resolves.
	pub append_slash: bool,
	/// Largest request body the server reads, in bytes.
	pub max_body_size: u64,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			debug: false,
			database_url: "sqlite://db.sqlite3".to_string(),
			bind_address: "127.0.0.1:8000".to_string(),
			index_page_size: 5,
			log_filter: "info".to_string(),
			append_slash: true,
			max_body_size: crate::server::DEFAULT_MAX_BODY_SIZE,
		}
	}
}

impl Settings {
	/// Load settings from the default sources.
	///
	/// The settings file is `$POLLS_SETTINGS_FILE` if set, otherwise
	/// `settings/base.toml`; a missing file is skipped.
	pub fn load() -> Result<Self, SettingsError> {
		let path = std::env::var(SETTINGS_FILE_ENV).unwrap_or_else(|_| DEFAULT_SETTINGS_FILE.to_string());
		Self::load_from(path)
	}

	/// Load settings using `path` as the settings file.
	pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
		SettingsBuilder::new()
			.add_source(TomlFileSource::new(path))
			.add_source(EnvSource::new().with_prefix(ENV_PREFIX))
			.build()
	}

	/// Check values that deserialize fine but cannot be used.
	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.database_url.trim().is_empty() {
			return Err(SettingsError::Invalid("database_url must not be empty".to_string()));
		}
		if self.index_page_size < 1 {
			return Err(SettingsError::Invalid(format!(
				"index_page_size must be at least 1, got {}",
				self.index_page_size
			)));
		}
		if self.max_body_size == 0 {
			return Err(SettingsError::Invalid("max_body_size must be positive".to_string()));
		}
		self.socket_addr()?;
		Ok(())
	}

	/// `bind_address` parsed as a socket address.
	pub fn socket_addr(&self) -> Result<SocketAddr, SettingsError> {
		self.bind_address.parse().map_err(|_| {
			SettingsError::Invalid(format!("bind_address '{}' is not host:port", self.bind_address))
		})
	}
}

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync {
	/// Load configuration from this source
	fn load(&self) -> Result<Map<String, Value>, SettingsError>;

	/// Get the priority of this source (higher = more important)
	fn priority(&self) -> u8;

	/// Get a description of this source
	fn description(&self) -> String;
}

/// Built-in defaults.
pub struct DefaultSource;

impl ConfigSource for DefaultSource {
	fn load(&self) -> Result<Map<String, Value>, SettingsError> {
		match serde_json::to_value(Settings::default())? {
			Value::Object(map) => Ok(map),
			_ => Err(SettingsError::Invalid("Defaults are not a table".to_string())),
		}
	}

	fn priority(&self) -> u8 {
		0
	}

	fn description(&self) -> String {
		"Defaults".to_string()
	}
}

/// TOML file configuration source
pub struct TomlFileSource {
	path: PathBuf,
}

impl TomlFileSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl ConfigSource for TomlFileSource {
	fn load(&self) -> Result<Map<String, Value>, SettingsError> {
		if !self.path.exists() {
			return Ok(Map::new());
		}

		let content = fs::read_to_string(&self.path).map_err(|source| SettingsError::Io {
			path: self.path.clone(),
			source,
		})?;
		let table: toml::Table = toml::from_str(&content)?;

		match serde_json::to_value(table)? {
			Value::Object(map) => Ok(map),
			_ => Err(SettingsError::Invalid("Expected a table at the root".to_string())),
		}
	}

	fn priority(&self) -> u8 {
		50
	}

	fn description(&self) -> String {
		format!("TOML file: {}", self.path.display())
	}
}

/// Environment variable configuration source
///
/// `POLLS_INDEX_PAGE_SIZE=10` sets `index_page_size`. Values that look like
/// booleans or integers are typed accordingly.
#[derive(Default)]
pub struct EnvSource {
	prefix: Option<String>,
	vars: Option<Vec<(String, String)>>,
}

impl EnvSource {
	pub fn new() -> Self {
		Self::default()
	}

	/// Only read variables starting with `prefix`, and strip it.
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = Some(prefix.into());
		self
	}

	/// Read from `vars` instead of the process environment.
	pub fn with_vars<I, K, V>(mut self, vars: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
		self
	}

	fn parse_value(value: String) -> Value {
		match value.trim().to_lowercase().as_str() {
			"true" | "yes" | "on" => return Value::Bool(true),
			"false" | "no" | "off" => return Value::Bool(false),
			_ => {}
		}
		if let Ok(num) = value.trim().parse::<i64>() {
			Value::Number(num.into())
		} else {
			Value::String(value)
		}
	}
}

impl ConfigSource for EnvSource {
	fn load(&self) -> Result<Map<String, Value>, SettingsError> {
		let vars = match &self.vars {
			Some(vars) => vars.clone(),
			None => std::env::vars().collect(),
		};

		let mut config = Map::new();
		for (key, value) in vars {
			let clean_key = match &self.prefix {
				Some(prefix) => match key.strip_prefix(prefix.as_str()) {
					Some(stripped) => stripped.to_string(),
					None => continue,
				},
				None => key,
			};
			config.insert(clean_key.to_lowercase(), Self::parse_value(value));
		}
		Ok(config)
	}

	fn priority(&self) -> u8 {
		100
	}

	fn description(&self) -> String {
		match &self.prefix {
			Some(prefix) => format!("Environment variables ({}*)", prefix),
			None => "Environment variables".to_string(),
		}
	}
}

/// Merges sources by priority and produces validated [`Settings`].
pub struct SettingsBuilder {
	sources: Vec<Box<dyn ConfigSource>>,
}

impl Default for SettingsBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl SettingsBuilder {
	/// A builder seeded with [`DefaultSource`].
	pub fn new() -> Self {
		Self {
			sources: vec![Box::new(DefaultSource)],
		}
	}

	pub fn add_source(mut self, source: impl ConfigSource + 'static) -> Self {
		self.sources.push(Box::new(source));
		self
	}

	/// Merged key/value view, before deserialization.
	pub fn merged(&self) -> Result<Map<String, Value>, SettingsError> {
		let mut ordered: Vec<&dyn ConfigSource> = self.sources.iter().map(|s| s.as_ref()).collect();
		ordered.sort_by_key(|s| s.priority());

		let mut merged = Map::new();
		for source in ordered {
			let values = source.load()?;
			tracing::trace!(source = %source.description(), keys = values.len(), "Loaded settings source");
			merged.extend(values);
		}
		Ok(merged)
	}

	pub fn build(&self) -> Result<Settings, SettingsError> {
		let merged = self.merged()?;
		let settings: Settings = serde_json::from_value(Value::Object(merged))
			.map_err(|e| SettingsError::Invalid(e.to_string()))?;
		settings.validate()?;
		Ok(settings)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serial_test::serial;
	use std::io::Write;

	#[rstest]
	fn test_defaults() {
		let settings = SettingsBuilder::new().build().unwrap();
		assert_eq!(settings, Settings::default());
		assert_eq!(settings.index_page_size, 5);
		assert!(settings.append_slash);
	}

	#[rstest]
	fn test_toml_overrides_defaults() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "debug = true\nindex_page_size = 10").unwrap();

		let settings = SettingsBuilder::new()
			.add_source(TomlFileSource::new(file.path()))
			.build()
			.unwrap();

		assert!(settings.debug);
		assert_eq!(settings.index_page_size, 10);
		assert_eq!(settings.bind_address, "127.0.0.1:8000");
	}

	#[rstest]
	fn test_env_overrides_toml() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "index_page_size = 10\nlog_filter = \"warn\"").unwrap();

		let settings = SettingsBuilder::new()
			.add_source(EnvSource::new().with_prefix(ENV_PREFIX).with_vars([
				("POLLS_INDEX_PAGE_SIZE", "3"),
				("POLLS_APPEND_SLASH", "false"),
				("OTHER_DEBUG", "true"),
			]))
			.add_source(TomlFileSource::new(file.path()))
			.build()
			.unwrap();

		assert_eq!(settings.index_page_size, 3);
		assert!(!settings.append_slash);
		assert_eq!(settings.log_filter, "warn");
		assert!(!settings.debug);
	}

	#[rstest]
	fn test_missing_file_is_skipped() {
		let source = TomlFileSource::new("does/not/exist.toml");
		assert!(source.load().unwrap().is_empty());
	}

	#[rstest]
	fn test_malformed_toml_is_an_error() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "debug = = true").unwrap();

		let result = SettingsBuilder::new()
			.add_source(TomlFileSource::new(file.path()))
			.build();
		assert!(matches!(result, Err(SettingsError::Toml(_))));
	}

	#[rstest]
	#[case("POLLS_INDEX_PAGE_SIZE", "0")]
	#[case("POLLS_INDEX_PAGE_SIZE", "many")]
	#[case("POLLS_BIND_ADDRESS", "localhost")]
	#[case("POLLS_MAX_BODY_SIZE", "0")]
	fn test_invalid_values_are_rejected(#[case] key: &str, #[case] value: &str) {
		let result = SettingsBuilder::new()
			.add_source(EnvSource::new().with_prefix(ENV_PREFIX).with_vars([(key, value)]))
			.build();
		assert!(matches!(result, Err(SettingsError::Invalid(_))));
	}

	#[rstest]
	#[serial(settings_env)]
	fn test_load_reads_process_environment() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("custom.toml");
		fs::write(&path, "database_url = \"sqlite::memory:\"\n").unwrap();

		// SAFETY: serialized with every other test touching these variables
		unsafe {
			std::env::set_var(SETTINGS_FILE_ENV, &path);
			std::env::set_var("POLLS_DEBUG", "yes");
		}
		let settings = Settings::load();
		unsafe {
			std::env::remove_var(SETTINGS_FILE_ENV);
			std::env::remove_var("POLLS_DEBUG");
		}

		let settings = settings.unwrap();
		assert_eq!(settings.database_url, "sqlite::memory:");
		assert!(settings.debug);
	}
}
