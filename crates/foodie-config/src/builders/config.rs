//! Configuration builder for tests and embedded use.
//!
//! Produces a valid `Config` without a file: memory storage and a memory
//! notifier by default, each registered with an empty implementation table.

use crate::{Config, NotificationConfig, ResumePolicy, StorageConfig, TrackerConfig};
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	tracker_id: String,
	icon_path: String,
	resume_policy: ResumePolicy,
	storage_primary: String,
	storage_config: toml::Value,
	notifications_primary: String,
	notifications_config: toml::Value,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

fn empty_table() -> toml::Value {
	toml::Value::Table(toml::map::Map::new())
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			tracker_id: "test-tracker".to_string(),
			icon_path: "/icons/icon-192.png".to_string(),
			resume_policy: ResumePolicy::Restart,
			storage_primary: "memory".to_string(),
			storage_config: empty_table(),
			notifications_primary: "memory".to_string(),
			notifications_config: empty_table(),
		}
	}

	pub fn tracker_id(mut self, id: impl Into<String>) -> Self {
		self.tracker_id = id.into();
		self
	}

	pub fn icon_path(mut self, path: impl Into<String>) -> Self {
		self.icon_path = path.into();
		self
	}

	pub fn resume_policy(mut self, policy: ResumePolicy) -> Self {
		self.resume_policy = policy;
		self
	}

	/// Sets the primary storage implementation and its configuration table.
	pub fn storage(mut self, primary: impl Into<String>, config: toml::Value) -> Self {
		self.storage_primary = primary.into();
		self.storage_config = config;
		self
	}

	/// Sets the primary notifier implementation and its configuration table.
	pub fn notifications(mut self, primary: impl Into<String>, config: toml::Value) -> Self {
		self.notifications_primary = primary.into();
		self.notifications_config = config;
		self
	}

	pub fn build(self) -> Config {
		Config {
			tracker: TrackerConfig {
				id: self.tracker_id,
				icon_path: self.icon_path,
				resume_policy: self.resume_policy,
			},
			storage: StorageConfig {
				implementations: HashMap::from([(
					self.storage_primary.clone(),
					self.storage_config,
				)]),
				primary: self.storage_primary,
			},
			notifications: NotificationConfig {
				implementations: HashMap::from([(
					self.notifications_primary.clone(),
					self.notifications_config,
				)]),
				primary: self.notifications_primary,
			},
		}
	}
}
