//! Recovery of an in-progress order after the application restarts.
//!
//! On load the stored collection is scanned for the most recent order that
//! is neither delivered nor stale. Its status is brought forward to the
//! window its age falls into, back-dated to when that status took effect,
//! and tracking is resumed according to the configured [`ResumePolicy`].

use crate::clock::Clock;
use crate::engine::event_bus::EventBus;
use crate::state::OrderLedger;
use crate::tracking::{OrderTracker, TransitionLadder};
use foodie_config::ResumePolicy;
use foodie_types::{truncate_id, OrderRecord, OrderStatus, TrackerEvent};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

/// Errors that can occur during recovery operations.
#[derive(Debug, Error)]
pub enum RecoveryError {
	#[error("Storage error: {0}")]
	Storage(String),
	#[error("Tracker error: {0}")]
	Tracker(String),
}

/// Report of the recovery operation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
	/// Number of stored records.
	pub total_orders: usize,
	/// Records that were neither delivered nor stale.
	pub active_orders: usize,
	/// The order tracking was resumed for, if any.
	pub resumed: Option<ResumedOrder>,
}

/// Order picked up by recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumedOrder {
	pub order_id: String,
	/// Status of the window the order's age fell into.
	pub status: OrderStatus,
	/// Milliseconds since the order's status took effect.
	pub elapsed_ms: u64,
}

/// Resumes the latest in-progress order at startup.
pub struct RecoveryService {
	ledger: Arc<OrderLedger>,
	tracker: Arc<OrderTracker>,
	event_bus: EventBus,
	clock: Arc<dyn Clock>,
	policy: ResumePolicy,
}

impl RecoveryService {
	pub fn new(
		ledger: Arc<OrderLedger>,
		tracker: Arc<OrderTracker>,
		event_bus: EventBus,
		clock: Arc<dyn Clock>,
		policy: ResumePolicy,
	) -> Self {
		Self {
			ledger,
			tracker,
			event_bus,
			clock,
			policy,
		}
	}

	/// Records written less than this long ago may still be in progress.
	pub fn stale_after() -> Duration {
		OrderStatus::Delivered.offset()
	}

	/// Finds the latest active order and resumes tracking it.
	///
	/// Does nothing when no record is active.
	#[instrument(skip_all)]
	pub async fn resume_on_load(&self) -> Result<RecoveryReport, RecoveryError> {
		let now = self.clock.now_ms();
		let records = self
			.ledger
			.all_orders()
			.await
			.map_err(|e| RecoveryError::Storage(e.to_string()))?;

		let mut report = RecoveryReport {
			total_orders: records.len(),
			..Default::default()
		};

		let stale_after_ms = Self::stale_after().as_millis() as u64;
		let active: Vec<&OrderRecord> = records
			.iter()
			.filter(|record| !record.status.is_terminal() && record.age_ms(now) < stale_after_ms)
			.collect();
		report.active_orders = active.len();

		let Some(latest) = latest(&active) else {
			tracing::info!(total = report.total_orders, "No active orders to resume");
			return Ok(report);
		};

		let elapsed_ms = latest.elapsed_ms(now);
		let status = TransitionLadder::window_for(Duration::from_millis(elapsed_ms));
		let timestamp = latest.timestamp + status.offset_ms();

		tracing::info!(
			order_id = %truncate_id(&latest.id),
			stored = %latest.status,
			%status,
			elapsed_ms,
			policy = ?self.policy,
			"Resuming order"
		);

		self.ledger
			.persist_status(&latest.id, status, timestamp)
			.await
			.map_err(|e| RecoveryError::Storage(e.to_string()))?;
		self.event_bus
			.publish(TrackerEvent::StatusPersisted {
				order_id: latest.id.clone(),
				status,
				timestamp,
			})
			.ok();

		match self.policy {
			ResumePolicy::Restart => {
				self.tracker
					.start_tracking(&latest.id)
					.await
					.map_err(|e| RecoveryError::Tracker(e.to_string()))?;
			},
			ResumePolicy::Continue => {
				self.tracker.continue_tracking(
					&latest.id,
					status,
					Duration::from_millis(elapsed_ms),
				);
			},
		}

		report.resumed = Some(ResumedOrder {
			order_id: latest.id.clone(),
			status,
			elapsed_ms,
		});
		Ok(report)
	}
}

/// Record with the greatest `timestamp`; the first one wins a tie.
fn latest<'a>(records: &[&'a OrderRecord]) -> Option<&'a OrderRecord> {
	records.iter().copied().fold(None, |best, record| match best {
		Some(best) if best.timestamp >= record.timestamp => Some(best),
		_ => Some(record),
	})
}
