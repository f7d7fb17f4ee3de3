//! Persistent ledger of tracked orders.
//!
//! All records live in a single JSON array under the `foodie:orders` key.
//! Writes are read-modify-write cycles over the whole array: the record with a
//! matching id is replaced in place, otherwise a new record is appended. A
//! process-local lock serializes those cycles so concurrent transitions for
//! different orders cannot drop each other's writes.

use crate::clock::Clock;
use foodie_storage::StorageService;
use foodie_types::{OrderRecord, OrderStatus, StorageKey};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors that can occur while reading or writing the order ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
	#[error("Storage error: {0}")]
	Storage(String),
}

/// Reads and upserts order records in storage.
pub struct OrderLedger {
	storage: Arc<StorageService>,
	clock: Arc<dyn Clock>,
	write_lock: Mutex<()>,
}

impl OrderLedger {
	pub fn new(storage: Arc<StorageService>, clock: Arc<dyn Clock>) -> Self {
		Self {
			storage,
			clock,
			write_lock: Mutex::new(()),
		}
	}

	/// Returns every stored record in collection order.
	///
	/// A missing key is an empty collection. Malformed stored data is an error.
	pub async fn all_orders(&self) -> Result<Vec<OrderRecord>, LedgerError> {
		let key = StorageKey::Orders;
		self.storage
			.retrieve_optional::<Vec<OrderRecord>>(key.namespace(), key.id())
			.await
			.map(Option::unwrap_or_default)
			.map_err(|e| LedgerError::Storage(e.to_string()))
	}

	/// Records `status` for an order and stamps `lastUpdate` with the current
	/// time.
	///
	/// `timestamp` is stored as given, so callers can back-date a status to
	/// the moment it logically took effect.
	pub async fn persist_status(
		&self,
		order_id: &str,
		status: OrderStatus,
		timestamp: u64,
	) -> Result<OrderRecord, LedgerError> {
		let _guard = self.write_lock.lock().await;

		let mut records = self.all_orders().await?;
		let record = OrderRecord {
			id: order_id.to_string(),
			status,
			timestamp,
			last_update: self.clock.now_ms(),
		};

		match records.iter_mut().find(|existing| existing.id == order_id) {
			Some(existing) => *existing = record.clone(),
			None => records.push(record.clone()),
		}

		let key = StorageKey::Orders;
		self.storage
			.store(key.namespace(), key.id(), &records)
			.await
			.map_err(|e| LedgerError::Storage(e.to_string()))?;

		Ok(record)
	}

	/// Looks up the stored record for an order.
	pub async fn get_status(&self, order_id: &str) -> Result<Option<OrderRecord>, LedgerError> {
		Ok(self
			.all_orders()
			.await?
			.into_iter()
			.find(|record| record.id == order_id))
	}
}
