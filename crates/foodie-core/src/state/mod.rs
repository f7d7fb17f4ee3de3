//! Persistent order state.
//!
//! The ledger is the only component that touches the stored order
//! collection; the tracker and the recovery service both go through it.

pub mod order;

pub use order::{LedgerError, OrderLedger};
