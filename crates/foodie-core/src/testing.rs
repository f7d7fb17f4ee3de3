//! Fixtures shared by the unit tests of this crate.

use crate::builder::TrackerFactories;
use crate::clock::{Clock, TokioClock};
use crate::engine::event_bus::EventBus;
use crate::state::OrderLedger;
use crate::tracking::OrderTracker;
use async_trait::async_trait;
use foodie_notify::implementations::memory::MemoryNotifier;
use foodie_notify::{NotificationService, NotifierFactory, Permission};
use foodie_storage::implementations::memory::MemoryStorage;
use foodie_storage::{StorageError, StorageFactory, StorageInterface, StorageService};
use foodie_types::{ConfigSchema, OrderRecord, OrderStatus, StorageKey, TrackerEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Fixed start time of every test clock.
pub(crate) const EPOCH: u64 = 1_700_000_000_000;

pub(crate) const ORDERS_KEY: &str = "foodie:orders";

/// Tracker wired to in-memory backends and a clock reading `EPOCH` at start.
pub(crate) struct Harness {
	pub storage: Arc<StorageService>,
	pub notifier: MemoryNotifier,
	pub clock: Arc<TokioClock>,
	pub event_bus: EventBus,
	pub ledger: Arc<OrderLedger>,
	pub tracker: Arc<OrderTracker>,
}

impl Harness {
	pub fn new() -> Self {
		Self::build(Box::new(MemoryStorage::new()), Permission::Granted)
	}

	pub fn with_permission(permission: Permission) -> Self {
		Self::build(Box::new(MemoryStorage::new()), permission)
	}

	pub fn with_storage(backend: impl StorageInterface + 'static) -> Self {
		Self::build(Box::new(backend), Permission::Granted)
	}

	fn build(backend: Box<dyn StorageInterface>, permission: Permission) -> Self {
		let storage = Arc::new(StorageService::new(backend));
		let notifier = MemoryNotifier::new(permission);
		let clock = Arc::new(TokioClock::starting_at(EPOCH));
		let event_bus = EventBus::new(256);
		let ledger = Arc::new(OrderLedger::new(storage.clone(), clock.clone()));
		let tracker = Arc::new(OrderTracker::new(
			ledger.clone(),
			Arc::new(NotificationService::new(
				Box::new(notifier.clone()),
				"/icons/icon-192.png",
			)),
			event_bus.clone(),
			clock.clone(),
		));

		Self {
			storage,
			notifier,
			clock,
			event_bus,
			ledger,
			tracker,
		}
	}

	/// Record as of `now`, with both times given as milliseconds in the past.
	pub fn record(
		&self,
		id: &str,
		status: OrderStatus,
		started_ago: u64,
		updated_ago: u64,
	) -> OrderRecord {
		let now = self.clock.now_ms();
		OrderRecord {
			id: id.to_string(),
			status,
			timestamp: now - started_ago,
			last_update: now - updated_ago,
		}
	}

	/// Replaces the stored collection.
	pub async fn seed(&self, records: &[OrderRecord]) {
		let key = StorageKey::Orders;
		self.storage
			.store(key.namespace(), key.id(), &records)
			.await
			.unwrap();
	}
}

/// Factories for every backend shipped with the storage and notify crates.
pub(crate) fn factories() -> TrackerFactories<StorageFactory, NotifierFactory> {
	TrackerFactories {
		storage_factories: foodie_storage::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect(),
		notifier_factories: foodie_notify::get_all_implementations()
			.into_iter()
			.map(|(name, factory)| (name.to_string(), factory))
			.collect(),
	}
}

/// Events received so far, without waiting.
pub(crate) fn drain(receiver: &mut broadcast::Receiver<TrackerEvent>) -> Vec<TrackerEvent> {
	let mut events = Vec::new();
	while let Ok(event) = receiver.try_recv() {
		events.push(event);
	}
	events
}

/// Status writes announced for `order_id`, in publish order.
pub(crate) fn persisted(events: &[TrackerEvent], order_id: &str) -> Vec<(OrderStatus, u64)> {
	events
		.iter()
		.filter_map(|event| match event {
			TrackerEvent::StatusPersisted {
				order_id: id,
				status,
				timestamp,
			} if id == order_id => Some((*status, *timestamp)),
			_ => None,
		})
		.collect()
}

/// Memory storage that rejects writes.
pub(crate) struct FailingStorage {
	inner: MemoryStorage,
	writes: AtomicUsize,
	fail_on: Option<usize>,
}

impl FailingStorage {
	/// Fails every write.
	pub fn writes() -> Self {
		Self {
			inner: MemoryStorage::new(),
			writes: AtomicUsize::new(0),
			fail_on: None,
		}
	}

	/// Fails only the `n`th write, counting from one.
	pub fn nth_write(n: usize) -> Self {
		Self {
			fail_on: Some(n),
			..Self::writes()
		}
	}
}

#[async_trait]
impl StorageInterface for FailingStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.inner.get_bytes(key).await
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let write = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
		match self.fail_on {
			Some(n) if n != write => self.inner.set_bytes(key, value).await,
			_ => Err(StorageError::Backend("quota exceeded".into())),
		}
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		self.inner.delete(key).await
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		self.inner.exists(key).await
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		self.inner.config_schema()
	}
}

/// Memory storage whose writes take `delay` to land.
pub(crate) struct SlowStorage {
	inner: MemoryStorage,
	delay: Duration,
}

impl SlowStorage {
	pub fn new(delay: Duration) -> Self {
		Self {
			inner: MemoryStorage::new(),
			delay,
		}
	}
}

#[async_trait]
impl StorageInterface for SlowStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.inner.get_bytes(key).await
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		tokio::time::sleep(self.delay).await;
		self.inner.set_bytes(key, value).await
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		self.inner.delete(key).await
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		self.inner.exists(key).await
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		self.inner.config_schema()
	}
}
