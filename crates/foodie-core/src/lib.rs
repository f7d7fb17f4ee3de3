//! Core order tracking for the foodie application.
//!
//! An order walks a fixed ladder of statuses, from `Placed` to `Delivered`,
//! driven by timers measured from the moment tracking started. Every
//! transition is persisted to the order ledger, announced on the event bus
//! and surfaced as a notification. After a restart the recovery service
//! picks up the most recent order that was still in progress.

pub mod builder;
pub mod clock;
pub mod engine;
pub mod recovery;
pub mod state;
pub mod tracking;

#[cfg(test)]
mod testing;

pub use builder::{BuilderError, TrackerBuilder, TrackerFactories};
pub use clock::{Clock, TokioClock};
pub use engine::{event_bus::EventBus, EngineError, TrackerEngine};
pub use recovery::{RecoveryError, RecoveryReport, RecoveryService, ResumedOrder};
pub use state::{LedgerError, OrderLedger};
pub use tracking::{OrderTracker, TrackerError, TrackingSession, TransitionLadder};
