//! Wall-clock source for persisted timestamps.
//!
//! Timestamps written to storage are milliseconds since the Unix epoch, while
//! transitions are scheduled on tokio's monotonic timer. `TokioClock` ties the
//! two together: it samples the system clock once and advances it with
//! `tokio::time::Instant`, so a paused test runtime moves persisted
//! timestamps and timer deadlines in lockstep.

use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync {
	fn now_ms(&self) -> u64;
}

/// Clock anchored to the system time at construction and advanced by tokio's
/// monotonic clock.
#[derive(Debug, Clone)]
pub struct TokioClock {
	anchor_ms: u64,
	anchor: Instant,
}

impl TokioClock {
	/// Creates a clock reading the current system time.
	pub fn new() -> Self {
		let anchor_ms = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.unwrap_or(Duration::ZERO)
			.as_millis() as u64;
		Self::starting_at(anchor_ms)
	}

	/// Creates a clock that reads `epoch_ms` now.
	pub fn starting_at(epoch_ms: u64) -> Self {
		Self {
			anchor_ms: epoch_ms,
			anchor: Instant::now(),
		}
	}
}

impl Default for TokioClock {
	fn default() -> Self {
		Self::new()
	}
}

impl Clock for TokioClock {
	fn now_ms(&self) -> u64 {
		self.anchor_ms
			.saturating_add(self.anchor.elapsed().as_millis() as u64)
	}
}
