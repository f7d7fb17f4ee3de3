//! Tracker engine assembling the order tracking services.
//!
//! The engine owns one ledger, one tracker and one recovery service for the
//! lifetime of an application session, all sharing the same storage, clock
//! and event bus.

pub mod event_bus;
pub mod lifecycle;

use crate::clock::Clock;
use crate::recovery::RecoveryService;
use crate::state::OrderLedger;
use crate::tracking::OrderTracker;
use foodie_config::Config;
use foodie_notify::NotificationService;
use foodie_storage::StorageService;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Recovery error: {0}")]
	Recovery(String),
}

/// Order tracking engine for one application session.
#[derive(Clone)]
pub struct TrackerEngine {
	pub(crate) config: Config,
	pub(crate) ledger: Arc<OrderLedger>,
	pub(crate) tracker: Arc<OrderTracker>,
	pub(crate) recovery: Arc<RecoveryService>,
	pub(crate) event_bus: event_bus::EventBus,
}

impl TrackerEngine {
	/// Creates an engine from its collaborators.
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		notifications: Arc<NotificationService>,
		clock: Arc<dyn Clock>,
		event_bus: event_bus::EventBus,
	) -> Self {
		let ledger = Arc::new(OrderLedger::new(storage, clock.clone()));
		let tracker = Arc::new(OrderTracker::new(
			ledger.clone(),
			notifications,
			event_bus.clone(),
			clock.clone(),
		));
		let recovery = Arc::new(RecoveryService::new(
			ledger.clone(),
			tracker.clone(),
			event_bus.clone(),
			clock,
			config.tracker.resume_policy,
		));

		Self {
			config,
			ledger,
			tracker,
			recovery,
			event_bus,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn ledger(&self) -> &Arc<OrderLedger> {
		&self.ledger
	}

	pub fn tracker(&self) -> &Arc<OrderTracker> {
		&self.tracker
	}

	pub fn recovery(&self) -> &Arc<RecoveryService> {
		&self.recovery
	}

	pub fn event_bus(&self) -> &event_bus::EventBus {
		&self.event_bus
	}
}
