//! Builder pattern for constructing tracker engines.
//!
//! Storage and notification backends are created through factory functions
//! keyed by implementation name. Every implementation listed in the
//! configuration that has a factory is constructed, so a bad table fails the
//! build even when it is not the primary; the primary one is then used.

use crate::clock::{Clock, TokioClock};
use crate::engine::{event_bus::EventBus, TrackerEngine};
use foodie_config::Config;
use foodie_notify::{NotificationService, NotifierInterface, NotifyError};
use foodie_storage::{StorageError, StorageInterface, StorageService};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during tracker engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every pluggable component, keyed by implementation
/// name.
pub struct TrackerFactories<SF, NF> {
	pub storage_factories: HashMap<String, SF>,
	pub notifier_factories: HashMap<String, NF>,
}

/// Builder for constructing a `TrackerEngine` with pluggable implementations.
pub struct TrackerBuilder {
	config: Config,
	clock: Option<Arc<dyn Clock>>,
	event_capacity: usize,
}

impl TrackerBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			clock: None,
			event_capacity: 256,
		}
	}

	/// Uses `clock` instead of the system clock.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = Some(clock);
		self
	}

	/// Sets how many events the bus buffers per subscriber.
	pub fn with_event_capacity(mut self, capacity: usize) -> Self {
		self.event_capacity = capacity;
		self
	}

	/// Builds the engine using the factories for each component type.
	pub fn build<SF, NF>(
		self,
		factories: TrackerFactories<SF, NF>,
	) -> Result<TrackerEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		NF: Fn(&toml::Value) -> Result<Box<dyn NotifierInterface>, NotifyError>,
	{
		let storage_backend = select_primary(
			"storage",
			&self.config.storage.primary,
			&self.config.storage.implementations,
			&factories.storage_factories,
		)?;
		let storage = Arc::new(StorageService::new(storage_backend));

		let notifier_backend = select_primary(
			"notifications",
			&self.config.notifications.primary,
			&self.config.notifications.implementations,
			&factories.notifier_factories,
		)?;
		let notifications = Arc::new(NotificationService::new(
			notifier_backend,
			self.config.tracker.icon_path.clone(),
		));

		let clock = self
			.clock
			.unwrap_or_else(|| Arc::new(TokioClock::new()));
		let event_bus = EventBus::new(self.event_capacity);

		Ok(TrackerEngine::new(
			self.config,
			storage,
			notifications,
			clock,
			event_bus,
		))
	}
}

/// Creates every configured implementation that has a factory and returns the
/// primary one.
fn select_primary<T, E, F>(
	component: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
) -> Result<T, BuilderError>
where
	E: Display,
	F: Fn(&toml::Value) -> Result<T, E>,
{
	let mut loaded = HashMap::new();
	for (name, config) in implementations {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(component, implementation = %name, "No factory registered, skipping");
			continue;
		};
		match factory(config) {
			Ok(implementation) => {
				let is_primary = primary == name;
				tracing::info!(component, implementation = %name, enabled = %is_primary, "Loaded");
				loaded.insert(name.clone(), implementation);
			},
			Err(e) => {
				tracing::error!(
					component,
					implementation = %name,
					error = %e,
					"Failed to create implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create {} implementation '{}': {}",
					component, name, e
				)));
			},
		}
	}

	if loaded.is_empty() {
		return Err(BuilderError::MissingComponent(format!(
			"No valid {} implementations available",
			component
		)));
	}

	loaded.remove(primary).ok_or_else(|| {
		BuilderError::Config(format!(
			"Primary {} '{}' failed to load or has invalid configuration",
			component, primary
		))
	})
}
