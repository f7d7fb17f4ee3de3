//! Event types published by the order tracker.
//!
//! Every persisted transition and every notification attempt is announced on
//! the event bus, so UI components and tests can observe the pipeline without
//! polling storage.

use crate::OrderStatus;
use serde::{Deserialize, Serialize};

/// Events emitted while tracking orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackerEvent {
	/// A status was written to storage for an order.
	StatusPersisted {
		order_id: String,
		status: OrderStatus,
		timestamp: u64,
	},
	/// A notification was displayed for a status.
	NotificationShown {
		order_id: String,
		status: OrderStatus,
	},
	/// Display was skipped because permission is denied or unavailable.
	NotificationSuppressed {
		order_id: String,
		status: OrderStatus,
	},
	/// Pending transitions of a session were aborted by a newer session.
	SessionCancelled { order_id: String, pending: usize },
	/// The session reached its terminal status.
	SessionCompleted { order_id: String },
}

