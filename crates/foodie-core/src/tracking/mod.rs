//! Timer-driven order tracking.

pub mod ladder;
pub mod tracker;

pub use ladder::{ScheduledTransition, TrackingSession, TransitionLadder};
pub use tracker::{OrderTracker, TrackerError};
