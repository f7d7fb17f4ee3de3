//! Configuration module for the foodie order tracker.
//!
//! Configuration is loaded from TOML. `${VAR}` and `${VAR:-default}`
//! references are resolved from the environment before parsing, and a file
//! may pull in other files with `include = ["storage.toml"]`. Each top-level
//! section must be unique across all included files.

pub mod builders;
mod loader;

pub use builders::config::ConfigBuilder;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message only; the default rendering echoes the whole input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Order tracker settings.
	pub tracker: TrackerConfig,
	/// Storage backend holding the order collection.
	pub storage: StorageConfig,
	/// Notification backend used for status notifications.
	pub notifications: NotificationConfig,
}

/// Order tracker settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackerConfig {
	/// Identifier of this application instance, used in logs.
	pub id: String,
	/// Icon shown with every status notification.
	#[serde(default = "default_icon_path")]
	pub icon_path: String,
	/// How an in-progress order is resumed at startup.
	#[serde(default)]
	pub resume_policy: ResumePolicy,
}

/// Strategy used to resume an in-progress order after a restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumePolicy {
	/// Persist the back-dated status, then restart tracking from `Placed`
	/// with the full transition ladder scheduled from now.
	#[default]
	Restart,
	/// Persist the back-dated status and schedule only the transitions that
	/// are still ahead, at their original offsets from the order start.
	Continue,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the notification backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of notifier implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

fn default_icon_path() -> String {
	"/icons/icon-192.png".to_string()
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of the environment variable and
/// supports defaults with `${VAR_NAME:-default_value}`.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Parses TOML whose environment variables were already substituted.
	pub(crate) fn from_resolved(resolved: &str) -> Result<Self, ConfigError> {
		let config: Config = toml::from_str(resolved)?;
		config.validate()?;
		Ok(config)
	}

	/// Validates cross-field constraints serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.tracker.id.trim().is_empty() {
			return Err(ConfigError::Validation("Tracker ID cannot be empty".into()));
		}
		if self.tracker.icon_path.trim().is_empty() {
			return Err(ConfigError::Validation(
				"Tracker icon_path cannot be empty".into(),
			));
		}

		Self::validate_section(
			"storage",
			&self.storage.primary,
			&self.storage.implementations,
		)?;
		Self::validate_section(
			"notifications",
			&self.notifications.primary,
			&self.notifications.implementations,
		)?;

		Ok(())
	}

	fn validate_section(
		section: &str,
		primary: &str,
		implementations: &HashMap<String, toml::Value>,
	) -> Result<(), ConfigError> {
		if implementations.is_empty() {
			return Err(ConfigError::Validation(format!(
				"At least one {} implementation must be configured",
				section
			)));
		}
		if primary.is_empty() {
			return Err(ConfigError::Validation(format!(
				"{} primary implementation cannot be empty",
				section
			)));
		}
		if !implementations.contains_key(primary) {
			return Err(ConfigError::Validation(format!(
				"Primary {} '{}' not found in implementations",
				section, primary
			)));
		}
		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating the
/// result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::from_resolved(&resolve_env_vars(s)?)
	}
}
