//! Order tracking types.
//!
//! An order walks a fixed, linear pipeline of statuses. Each status owns the
//! offset (measured from the moment tracking started) at which it becomes
//! effective and the notification text shown when it is reached.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Persisted state of a single tracked order.
///
/// Records are kept in an insertion-ordered collection under one storage
/// key. A record is created when tracking starts and replaced in place at
/// every transition; the tracker never deletes one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
	/// Opaque identifier supplied by the checkout flow.
	pub id: String,
	/// Current status of the order.
	pub status: OrderStatus,
	/// Epoch milliseconds at which `status` became effective.
	///
	/// May be back-dated when an order is resumed after a restart.
	pub timestamp: u64,
	/// Epoch milliseconds of the last write of this record.
	pub last_update: u64,
}

impl OrderRecord {
	/// Milliseconds since the record was last written, saturating at zero.
	pub fn age_ms(&self, now_ms: u64) -> u64 {
		now_ms.saturating_sub(self.last_update)
	}

	/// Milliseconds since `status` became effective, saturating at zero.
	pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
		now_ms.saturating_sub(self.timestamp)
	}
}

/// Status of an order in the delivery pipeline.
///
/// The variants are declared in pipeline order, so `Ord` follows the
/// lifecycle: `Placed < Preparing < Ready < OnTheWay < Delivered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
	/// Order has been received. Entered synchronously when tracking starts.
	Placed,
	/// The kitchen is preparing the order.
	Preparing,
	/// The order is packed and waiting for a rider.
	Ready,
	/// A rider is delivering the order.
	OnTheWay,
	/// The order has been delivered. Terminal.
	Delivered,
}

impl OrderStatus {
	/// Every status in pipeline order.
	pub const ALL: [OrderStatus; 5] = [
		OrderStatus::Placed,
		OrderStatus::Preparing,
		OrderStatus::Ready,
		OrderStatus::OnTheWay,
		OrderStatus::Delivered,
	];

	/// Offset from tracking start at which this status becomes effective.
	///
	/// Offsets are absolute (relative to the order start), not cumulative.
	pub fn offset(&self) -> Duration {
		match self {
			OrderStatus::Placed => Duration::ZERO,
			OrderStatus::Preparing => Duration::from_secs(10),
			OrderStatus::Ready => Duration::from_secs(20),
			OrderStatus::OnTheWay => Duration::from_secs(30),
			OrderStatus::Delivered => Duration::from_secs(45),
		}
	}

	/// Offset in whole milliseconds, as used in persisted timestamps.
	pub fn offset_ms(&self) -> u64 {
		self.offset().as_millis() as u64
	}

	pub fn is_terminal(&self) -> bool {
		matches!(self, OrderStatus::Delivered)
	}

	/// Fixed notification shown when an order reaches this status.
	pub fn notification(&self) -> NotificationText {
		let (title, body) = match self {
			OrderStatus::Placed => ("Order placed", "We have received your order."),
			OrderStatus::Preparing => ("Preparing order", "The kitchen is preparing your food."),
			OrderStatus::Ready => ("Order ready", "Your order is packed and ready for pickup."),
			OrderStatus::OnTheWay => ("On the way", "Your rider is on the way with your order."),
			OrderStatus::Delivered => ("Order delivered", "Enjoy your meal!"),
		};
		NotificationText { title, body }
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrderStatus::Placed => write!(f, "Placed"),
			OrderStatus::Preparing => write!(f, "Preparing"),
			OrderStatus::Ready => write!(f, "Ready"),
			OrderStatus::OnTheWay => write!(f, "OnTheWay"),
			OrderStatus::Delivered => write!(f, "Delivered"),
		}
	}
}

/// Title and body of a status notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationText {
	pub title: &'static str,
	pub body: &'static str,
}
