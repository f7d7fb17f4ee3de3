//! Notification module for the foodie order tracker.
//!
//! This module abstracts the permission-gated system notification primitive.
//! Permission is requested once, lazily, on the first display attempt; when
//! it is denied or the backend cannot provide notifications, display becomes a
//! silent no-op. Notification failures never affect order state.

use async_trait::async_trait;
use foodie_types::{ConfigSchema, ImplementationRegistry};
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::OnceCell;

/// Re-export implementations
pub mod implementations {
	pub mod log;
	pub mod memory;
}

/// Errors that can occur while displaying notifications.
#[derive(Debug, Error)]
pub enum NotifyError {
	/// The backend failed to request permission or display a notification.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Outcome of a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
	Granted,
	Denied,
	/// The platform has no notification support.
	Unavailable,
}

impl Permission {
	pub fn is_granted(&self) -> bool {
		matches!(self, Permission::Granted)
	}
}

impl FromStr for Permission {
	type Err = NotifyError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"granted" => Ok(Permission::Granted),
			"denied" => Ok(Permission::Denied),
			"unavailable" => Ok(Permission::Unavailable),
			other => Err(NotifyError::Configuration(format!(
				"Unknown permission '{}'",
				other
			))),
		}
	}
}

/// Accepted values of the `permission` option of notifier backends.
pub const PERMISSION_VALUES: &[&str] = &["granted", "denied", "unavailable"];

/// A notification to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
	pub title: String,
	pub body: String,
	pub icon: String,
}

/// Opaque handle of a displayed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationHandle(pub u64);

/// Low-level interface for notification backends.
#[async_trait]
pub trait NotifierInterface: Send + Sync {
	/// Asks the platform for permission to display notifications.
	async fn request_permission(&self) -> Result<Permission, NotifyError>;

	/// Displays a notification. Only called after permission was granted.
	async fn show(&self, notification: &Notification) -> Result<NotificationHandle, NotifyError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for notifier factory functions.
pub type NotifierFactory = fn(&toml::Value) -> Result<Box<dyn NotifierInterface>, NotifyError>;

/// Registry trait for notifier implementations.
pub trait NotifierRegistry: ImplementationRegistry<Factory = NotifierFactory> {}

/// Get all registered notifier implementations as (name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, NotifierFactory)> {
	use implementations::{log, memory};

	vec![
		(log::Registry::NAME, log::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Reads the optional `permission` option of a backend table.
pub(crate) fn permission_from_config(config: &toml::Value) -> Result<Permission, NotifyError> {
	config
		.get("permission")
		.and_then(|v| v.as_str())
		.unwrap_or("granted")
		.parse()
}

/// Notification service with a lazily requested, cached permission.
pub struct NotificationService {
	backend: Box<dyn NotifierInterface>,
	icon_path: String,
	permission: OnceCell<Permission>,
}

impl NotificationService {
	/// Creates a service displaying notifications with the given icon.
	pub fn new(backend: Box<dyn NotifierInterface>, icon_path: impl Into<String>) -> Self {
		Self {
			backend,
			icon_path: icon_path.into(),
			permission: OnceCell::new(),
		}
	}

	/// Returns the cached permission, requesting it on first use.
	///
	/// A failed request is treated as `Unavailable` and is not retried.
	pub async fn permission(&self) -> Permission {
		*self
			.permission
			.get_or_init(|| async {
				match self.backend.request_permission().await {
					Ok(permission) => {
						tracing::debug!(?permission, "Notification permission resolved");
						permission
					},
					Err(e) => {
						tracing::warn!(error = %e, "Notification permission request failed");
						Permission::Unavailable
					},
				}
			})
			.await
	}

	/// Displays a notification if permission allows.
	///
	/// Returns `Ok(None)` when display was suppressed by permission.
	pub async fn notify(
		&self,
		title: &str,
		body: &str,
	) -> Result<Option<NotificationHandle>, NotifyError> {
		if !self.permission().await.is_granted() {
			return Ok(None);
		}

		let notification = Notification {
			title: title.to_string(),
			body: body.to_string(),
			icon: self.icon_path.clone(),
		};
		self.backend.show(&notification).await.map(Some)
	}
}
