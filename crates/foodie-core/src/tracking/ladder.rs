//! Transition schedule of a tracked order.
//!
//! `TransitionLadder` is the fixed table of deferred transitions. A
//! `TrackingSession` is one run of that table for one order: where the run is
//! measured from, what has been reached and what is still pending.

use foodie_types::OrderStatus;
use std::time::Duration;
use tokio::time::Instant;

/// A transition that fires `offset` after the order started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTransition {
	pub status: OrderStatus,
	pub offset: Duration,
}

/// The fixed offsets of every deferred transition.
pub struct TransitionLadder;

impl TransitionLadder {
	/// Every transition after `Placed`, in firing order.
	pub fn full() -> Vec<ScheduledTransition> {
		Self::after(OrderStatus::Placed)
	}

	/// Transitions strictly after `status`, in firing order.
	pub fn after(status: OrderStatus) -> Vec<ScheduledTransition> {
		OrderStatus::ALL
			.into_iter()
			.filter(|candidate| *candidate > status)
			.map(|status| ScheduledTransition {
				status,
				offset: status.offset(),
			})
			.collect()
	}

	/// Status whose window contains `elapsed`.
	///
	/// Windows are `[0, 10s)` Placed, `[10s, 20s)` Preparing, `[20s, 30s)`
	/// Ready and anything later OnTheWay. Delivered is never a window: an
	/// order old enough to be delivered is resumed one step short of it.
	pub fn window_for(elapsed: Duration) -> OrderStatus {
		OrderStatus::ALL
			.into_iter()
			.filter(|status| !status.is_terminal() && status.offset() <= elapsed)
			.last()
			.unwrap_or(OrderStatus::Placed)
	}
}

/// One tracking run for one order.
#[derive(Debug, Clone)]
pub struct TrackingSession {
	order_id: String,
	/// Instant at which the pending transitions were scheduled.
	scheduled_at: Instant,
	/// Time already elapsed since the order started when scheduling happened.
	elapsed_at_schedule: Duration,
	/// Epoch milliseconds of the order start this session measures from.
	started_at_ms: u64,
	current: OrderStatus,
	pending: Vec<ScheduledTransition>,
}

impl TrackingSession {
	/// A fresh session: `Placed` reached now, the full ladder pending.
	pub fn start(order_id: impl Into<String>, now: Instant, now_ms: u64) -> Self {
		Self {
			order_id: order_id.into(),
			scheduled_at: now,
			elapsed_at_schedule: Duration::ZERO,
			started_at_ms: now_ms,
			current: OrderStatus::Placed,
			pending: TransitionLadder::full(),
		}
	}

	/// A session picking up an order that started `elapsed` ago and has
	/// already reached `current`.
	pub fn resume(
		order_id: impl Into<String>,
		current: OrderStatus,
		elapsed: Duration,
		now: Instant,
		now_ms: u64,
	) -> Self {
		Self {
			order_id: order_id.into(),
			scheduled_at: now,
			elapsed_at_schedule: elapsed,
			started_at_ms: now_ms.saturating_sub(elapsed.as_millis() as u64),
			current,
			pending: TransitionLadder::after(current),
		}
	}

	pub fn order_id(&self) -> &str {
		&self.order_id
	}

	pub fn started_at_ms(&self) -> u64 {
		self.started_at_ms
	}

	pub fn current(&self) -> OrderStatus {
		self.current
	}

	pub fn pending(&self) -> &[ScheduledTransition] {
		&self.pending
	}

	/// Instant at which `transition` is due. Transitions whose offset has
	/// already passed are due immediately.
	pub fn deadline(&self, transition: &ScheduledTransition) -> Instant {
		self.scheduled_at + transition.offset.saturating_sub(self.elapsed_at_schedule)
	}

	/// Marks `status` reached and drops it from the pending list.
	pub fn advance(&mut self, status: OrderStatus) {
		self.pending.retain(|transition| transition.status != status);
		if status > self.current {
			self.current = status;
		}
	}

	pub fn is_complete(&self) -> bool {
		self.current.is_terminal()
	}
}
