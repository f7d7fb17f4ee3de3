//! Registry of backend factories available to the binary.
//!
//! Every implementation a backend crate exports through
//! `get_all_implementations` is registered once, so configuration can name
//! any of them without the binary listing them by hand.

use foodie_core::TrackerFactories;
use foodie_notify::NotifierFactory;
use foodie_storage::StorageFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Factories for every pluggable component, keyed by implementation name.
#[derive(Default)]
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
	pub notifier: HashMap<String, NotifierFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}

	pub fn register_notifier(&mut self, name: impl Into<String>, factory: NotifierFactory) {
		self.notifier.insert(name.into(), factory);
	}

	/// Copies the registered factories into the shape the tracker builder
	/// expects.
	pub fn tracker_factories(&self) -> TrackerFactories<StorageFactory, NotifierFactory> {
		TrackerFactories {
			storage_factories: self.storage.clone(),
			notifier_factories: self.notifier.clone(),
		}
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Returns the global registry, registering all implementations on first use.
pub fn initialize_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in foodie_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.register_storage(name, factory);
		}

		for (name, factory) in foodie_notify::get_all_implementations() {
			tracing::debug!("Registering notifier implementation: {}", name);
			registry.register_notifier(name, factory);
		}

		registry
	})
}
