//! Common types module for the foodie order tracker.
//!
//! This module defines the data types shared by every tracker component:
//! the persisted order record, the status pipeline, storage keys, tracker
//! events and the configuration validation framework used by pluggable
//! backends.

/// Event types published by the tracker.
pub mod events;
/// Order record and status pipeline types.
pub mod order;
/// Registry trait for pluggable implementations.
pub mod registry;
/// Storage key types for persisted collections.
pub mod storage;
/// Small helpers shared across crates.
pub mod utils;
/// Configuration validation types for backend configuration tables.
pub mod validation;

pub use events::*;
pub use order::*;
pub use registry::ImplementationRegistry;
pub use storage::*;
pub use utils::truncate_id;
pub use validation::*;
