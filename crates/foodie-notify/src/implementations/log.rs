//! Log notifier backend.
//!
//! Displays notifications as structured log lines. This is the default
//! backend for the command-line service, where there is no desktop shell to
//! show system notifications.

use crate::{
	permission_from_config, Notification, NotificationHandle, NotifierFactory, NotifierInterface,
	NotifierRegistry, NotifyError, Permission, PERMISSION_VALUES,
};
use async_trait::async_trait;
use foodie_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use std::sync::atomic::{AtomicU64, Ordering};

pub struct LogNotifier {
	permission: Permission,
	next_handle: AtomicU64,
}

impl LogNotifier {
	pub fn new(permission: Permission) -> Self {
		Self {
			permission,
			next_handle: AtomicU64::new(1),
		}
	}
}

#[async_trait]
impl NotifierInterface for LogNotifier {
	async fn request_permission(&self) -> Result<Permission, NotifyError> {
		Ok(self.permission)
	}

	async fn show(&self, notification: &Notification) -> Result<NotificationHandle, NotifyError> {
		let handle = NotificationHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
		tracing::info!(
			target: "foodie::notification",
			handle = handle.0,
			icon = %notification.icon,
			"{}: {}",
			notification.title,
			notification.body
		);
		Ok(handle)
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LogNotifierSchema)
	}
}

/// Configuration schema for LogNotifier.
pub struct LogNotifierSchema;

impl ConfigSchema for LogNotifierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![],
			vec![Field::new("permission", FieldType::OneOf(PERMISSION_VALUES))],
		)
		.validate(config)
	}
}

/// Factory function to create a log notifier from configuration.
///
/// Configuration parameters:
/// - `permission`: "granted" (default), "denied" or "unavailable"
pub fn create_notifier(config: &toml::Value) -> Result<Box<dyn NotifierInterface>, NotifyError> {
	LogNotifierSchema
		.validate(config)
		.map_err(|e| NotifyError::Configuration(e.to_string()))?;
	Ok(Box::new(LogNotifier::new(permission_from_config(config)?)))
}

/// Registry for the log notifier implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "log";
	type Factory = NotifierFactory;

	fn factory() -> Self::Factory {
		create_notifier
	}
}

impl NotifierRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_handles_are_distinct() {
		let notifier = LogNotifier::new(Permission::Granted);
		let notification = Notification {
			title: "Order placed".into(),
			body: "We have received your order.".into(),
			icon: "/icons/icon-192.png".into(),
		};

		let first = notifier.show(&notification).await.unwrap();
		let second = notifier.show(&notification).await.unwrap();
		assert_ne!(first, second);
	}

	#[tokio::test]
	async fn test_default_permission_is_granted() {
		let notifier = create_notifier(&toml::Value::Table(toml::map::Map::new())).unwrap();
		assert!(notifier.request_permission().await.unwrap().is_granted());
	}
}
