//! Recording notifier backend.
//!
//! Stores every displayed notification in memory instead of showing it.
//! Useful for tests and for headless runs where notifications are inspected
//! programmatically.

use crate::{
	permission_from_config, Notification, NotificationHandle, NotifierFactory, NotifierInterface,
	NotifierRegistry, NotifyError, Permission, PERMISSION_VALUES,
};
use async_trait::async_trait;
use foodie_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory notifier. Clones share the recorded notifications.
#[derive(Clone)]
pub struct MemoryNotifier {
	permission: Permission,
	shown: Arc<Mutex<Vec<Notification>>>,
	requests: Arc<AtomicUsize>,
}

impl MemoryNotifier {
	/// Creates a notifier that answers permission requests with `permission`.
	pub fn new(permission: Permission) -> Self {
		Self {
			permission,
			shown: Arc::new(Mutex::new(Vec::new())),
			requests: Arc::new(AtomicUsize::new(0)),
		}
	}

	/// Notifications displayed so far, oldest first.
	pub fn shown(&self) -> Vec<Notification> {
		self.shown
			.lock()
			.map(|shown| shown.clone())
			.unwrap_or_default()
	}

	/// How many times permission was requested.
	pub fn permission_requests(&self) -> usize {
		self.requests.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl NotifierInterface for MemoryNotifier {
	async fn request_permission(&self) -> Result<Permission, NotifyError> {
		self.requests.fetch_add(1, Ordering::SeqCst);
		Ok(self.permission)
	}

	async fn show(&self, notification: &Notification) -> Result<NotificationHandle, NotifyError> {
		let mut shown = self
			.shown
			.lock()
			.map_err(|e| NotifyError::Backend(e.to_string()))?;
		shown.push(notification.clone());
		Ok(NotificationHandle(shown.len() as u64))
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryNotifierSchema)
	}
}

/// Configuration schema for MemoryNotifier.
pub struct MemoryNotifierSchema;

impl ConfigSchema for MemoryNotifierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![],
			vec![Field::new("permission", FieldType::OneOf(PERMISSION_VALUES))],
		)
		.validate(config)
	}
}

/// Factory function to create a recording notifier from configuration.
///
/// Configuration parameters:
/// - `permission`: "granted" (default), "denied" or "unavailable"
pub fn create_notifier(config: &toml::Value) -> Result<Box<dyn NotifierInterface>, NotifyError> {
	MemoryNotifierSchema
		.validate(config)
		.map_err(|e| NotifyError::Configuration(e.to_string()))?;
	Ok(Box::new(MemoryNotifier::new(permission_from_config(config)?)))
}

/// Registry for the memory notifier implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = NotifierFactory;

	fn factory() -> Self::Factory {
		create_notifier
	}
}

impl NotifierRegistry for Registry {}
