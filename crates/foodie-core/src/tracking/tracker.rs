//! Order tracker driving the status ladder of one order at a time.
//!
//! Starting a session persists `Placed`, then spawns one task per remaining
//! transition. Each task sleeps until its deadline, persists its status,
//! publishes the write on the event bus and raises a notification. A tracker
//! owns at most one session; starting another aborts the tasks of the
//! previous one that have not finished yet.

use super::ladder::TrackingSession;
use crate::clock::Clock;
use crate::engine::event_bus::EventBus;
use crate::state::{LedgerError, OrderLedger};
use foodie_notify::NotificationService;
use foodie_types::{truncate_id, OrderRecord, OrderStatus, TrackerEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{instrument, Instrument};

/// Errors returned by tracker operations.
#[derive(Debug, Error)]
pub enum TrackerError {
	#[error("Ledger error: {0}")]
	Ledger(String),
}

/// Whether the tracker currently drives a session.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionState {
	Idle,
	Tracking { generation: u64 },
}

/// Session owned by the tracker together with the tasks firing its
/// transitions.
struct ActiveSession {
	generation: u64,
	session: Arc<Mutex<TrackingSession>>,
	handles: Vec<JoinHandle<()>>,
}

/// Collaborators shared with the transition tasks.
struct Shared {
	ledger: Arc<OrderLedger>,
	notifications: Arc<NotificationService>,
	event_bus: EventBus,
	clock: Arc<dyn Clock>,
	state: watch::Sender<SessionState>,
}

impl Shared {
	/// Persists `status`, announces the write and raises the notification.
	async fn apply(
		&self,
		order_id: &str,
		status: OrderStatus,
		timestamp: u64,
	) -> Result<OrderRecord, LedgerError> {
		let record = self
			.ledger
			.persist_status(order_id, status, timestamp)
			.await?;
		tracing::debug!(%status, timestamp, "Status persisted");
		self.event_bus
			.publish(TrackerEvent::StatusPersisted {
				order_id: order_id.to_string(),
				status,
				timestamp,
			})
			.ok();

		self.notify(order_id, status).await;
		Ok(record)
	}

	async fn notify(&self, order_id: &str, status: OrderStatus) {
		let text = status.notification();
		match self.notifications.notify(text.title, text.body).await {
			Ok(Some(handle)) => {
				tracing::debug!(handle = handle.0, %status, "Notification shown");
				self.event_bus
					.publish(TrackerEvent::NotificationShown {
						order_id: order_id.to_string(),
						status,
					})
					.ok();
			},
			Ok(None) => {
				tracing::debug!(%status, "Notification suppressed by permission");
				self.event_bus
					.publish(TrackerEvent::NotificationSuppressed {
						order_id: order_id.to_string(),
						status,
					})
					.ok();
			},
			Err(e) => {
				tracing::warn!(%status, error = %e, "Failed to show notification");
			},
		}
	}

	/// Runs a transition whose deadline has passed.
	///
	/// There is no caller to report a failure to, so it is logged and the
	/// rest of the ladder still fires.
	async fn fire(
		&self,
		order_id: &str,
		generation: u64,
		session: &Mutex<TrackingSession>,
		status: OrderStatus,
	) {
		let now_ms = self.clock.now_ms();
		if let Err(e) = self.apply(order_id, status, now_ms).await {
			tracing::error!(%status, error = %e, "Failed to persist scheduled transition");
		}
		lock(session).advance(status);

		if status.is_terminal() {
			tracing::info!("Order delivered, tracking complete");
			self.event_bus
				.publish(TrackerEvent::SessionCompleted {
					order_id: order_id.to_string(),
				})
				.ok();
			self.finish(generation);
		}
	}

	/// Marks the tracker idle if `generation` is still the current session.
	fn finish(&self, generation: u64) {
		self.state.send_if_modified(|state| match state {
			SessionState::Tracking { generation: current } if *current == generation => {
				*state = SessionState::Idle;
				true
			},
			_ => false,
		});
	}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Tracks one order at a time through the delivery pipeline.
///
/// Built once per application session and shared by `Arc`. Dropping the
/// tracker aborts its pending transitions.
pub struct OrderTracker {
	shared: Arc<Shared>,
	active: Mutex<Option<ActiveSession>>,
	generation: AtomicU64,
}

impl OrderTracker {
	pub fn new(
		ledger: Arc<OrderLedger>,
		notifications: Arc<NotificationService>,
		event_bus: EventBus,
		clock: Arc<dyn Clock>,
	) -> Self {
		let (state, _) = watch::channel(SessionState::Idle);
		Self {
			shared: Arc::new(Shared {
				ledger,
				notifications,
				event_bus,
				clock,
				state,
			}),
			active: Mutex::new(None),
			generation: AtomicU64::new(0),
		}
	}

	/// Starts tracking `order_id` from `Placed`.
	///
	/// Cancels the previous session, persists `Placed` stamped with the
	/// current time and schedules the remaining transitions relative to now.
	/// Returns the persisted `Placed` record. The tracker stays idle until
	/// the `Placed` write succeeds.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn start_tracking(&self, order_id: &str) -> Result<OrderRecord, TrackerError> {
		self.abort_active();

		let now = Instant::now();
		let now_ms = self.shared.clock.now_ms();
		let record = self
			.shared
			.apply(order_id, OrderStatus::Placed, now_ms)
			.await
			.map_err(|e| TrackerError::Ledger(e.to_string()))?;

		self.schedule(TrackingSession::start(order_id, now, now_ms));
		tracing::info!("Tracking started");
		Ok(record)
	}

	/// Picks up an order that started `elapsed` ago and already reached
	/// `current`, scheduling only the transitions after `current` at their
	/// original offsets. Nothing is persisted here.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub fn continue_tracking(&self, order_id: &str, current: OrderStatus, elapsed: Duration) {
		let session = TrackingSession::resume(
			order_id,
			current,
			elapsed,
			Instant::now(),
			self.shared.clock.now_ms(),
		);
		if session.pending().is_empty() {
			self.abort_active();
			return;
		}

		let elapsed_ms = elapsed.as_millis() as u64;
		tracing::info!(%current, elapsed_ms, "Tracking continued");
		self.schedule(session);
	}

	/// Looks up the stored record for an order.
	pub async fn get_status(&self, order_id: &str) -> Result<Option<OrderRecord>, TrackerError> {
		self.shared
			.ledger
			.get_status(order_id)
			.await
			.map_err(|e| TrackerError::Ledger(e.to_string()))
	}

	/// Snapshot of the active session, if any.
	pub fn current_session(&self) -> Option<TrackingSession> {
		lock(&self.active)
			.as_ref()
			.map(|active| lock(&active.session).clone())
	}

	/// Cancels the active session. Returns how many transitions were still
	/// pending.
	pub fn cancel(&self) -> usize {
		self.abort_active()
	}

	/// Waits until the active session reaches `Delivered` or is cancelled.
	/// Returns immediately when no session is active.
	pub async fn wait_until_idle(&self) {
		let mut state = self.shared.state.subscribe();
		// The sender lives as long as `self`, so this cannot fail.
		let _ = state
			.wait_for(|state| *state == SessionState::Idle)
			.await;
	}

	/// Installs `session` as the active one and spawns its transition tasks.
	///
	/// The generation bump, the spawn and the swap happen under the `active`
	/// lock, so whichever call installs last owns the tracker and every
	/// session it replaced is aborted.
	fn schedule(&self, session: TrackingSession) {
		let order_id = session.order_id().to_string();
		let transitions: Vec<_> = session
			.pending()
			.iter()
			.map(|transition| (transition.status, session.deadline(transition)))
			.collect();
		let session = Arc::new(Mutex::new(session));

		let mut active = lock(&self.active);
		let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
		self.shared
			.state
			.send_replace(SessionState::Tracking { generation });

		let handles = transitions
			.into_iter()
			.map(|(status, deadline)| {
				let shared = self.shared.clone();
				let session = session.clone();
				let order_id = order_id.clone();
				let span = tracing::info_span!(
					"transition",
					order_id = %truncate_id(&order_id),
					%status
				);
				tokio::spawn(
					async move {
						tokio::time::sleep_until(deadline).await;
						shared.fire(&order_id, generation, &session, status).await;
					}
					.instrument(span),
				)
			})
			.collect();

		let previous = active.replace(ActiveSession {
			generation,
			session,
			handles,
		});
		drop(active);

		if let Some(previous) = previous {
			self.retire(previous);
		}
	}

	/// Aborts the tasks of the active session and returns how many had not
	/// finished.
	fn abort_active(&self) -> usize {
		let previous = lock(&self.active).take();
		previous.map_or(0, |previous| self.retire(previous))
	}

	fn retire(&self, previous: ActiveSession) -> usize {
		let pending = previous
			.handles
			.iter()
			.filter(|handle| !handle.is_finished())
			.count();
		for handle in &previous.handles {
			handle.abort();
		}
		self.shared.finish(previous.generation);

		if pending > 0 {
			let order_id = lock(&previous.session).order_id().to_string();
			tracing::info!(
				order_id = %truncate_id(&order_id),
				generation = previous.generation,
				pending,
				"Cancelled pending transitions"
			);
			self.shared
				.event_bus
				.publish(TrackerEvent::SessionCancelled { order_id, pending })
				.ok();
		}
		pending
	}
}

impl Drop for OrderTracker {
	fn drop(&mut self) {
		if let Some(active) = lock(&self.active).take() {
			for handle in active.handles {
				handle.abort();
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{drain, persisted, FailingStorage, Harness, SlowStorage, EPOCH};
	use foodie_notify::Permission;

	const ORDER: &str = "order-1";

	#[tokio::test(start_paused = true)]
	async fn test_start_persists_placed_at_start_time() {
		let harness = Harness::new();

		let placed = harness.tracker.start_tracking(ORDER).await.unwrap();
		assert_eq!(placed.status, OrderStatus::Placed);
		assert_eq!(placed.timestamp, EPOCH);

		let record = harness.tracker.get_status(ORDER).await.unwrap().unwrap();
		assert_eq!(record.status, OrderStatus::Placed);
		assert_eq!(record.timestamp, EPOCH);
		assert_eq!(record.last_update, EPOCH);
	}

	#[tokio::test(start_paused = true)]
	async fn test_full_ladder_reaches_delivered() {
		let harness = Harness::new();
		let mut events = harness.event_bus.subscribe();

		harness.tracker.start_tracking(ORDER).await.unwrap();
		tokio::time::sleep(Duration::from_secs(46)).await;

		let record = harness.tracker.get_status(ORDER).await.unwrap().unwrap();
		assert_eq!(record.status, OrderStatus::Delivered);
		assert_eq!(record.timestamp, EPOCH + 45_000);

		let events = drain(&mut events);
		let writes = persisted(&events, ORDER);
		let offsets: Vec<u64> = writes.iter().map(|(_, ts)| ts - EPOCH).collect();
		assert_eq!(offsets, vec![0, 10_000, 20_000, 30_000, 45_000]);
		let statuses: Vec<_> = writes.iter().map(|(status, _)| *status).collect();
		assert_eq!(statuses, OrderStatus::ALL.to_vec());
		assert!(events.contains(&TrackerEvent::SessionCompleted {
			order_id: ORDER.into()
		}));

		let titles: Vec<_> = harness.notifier.shown().into_iter().map(|n| n.title).collect();
		assert_eq!(
			titles,
			vec![
				"Order placed",
				"Preparing order",
				"Order ready",
				"On the way",
				"Order delivered"
			]
		);
		assert!(harness
			.notifier
			.shown()
			.iter()
			.all(|n| n.icon == "/icons/icon-192.png"));

		let session = harness.tracker.current_session().unwrap();
		assert!(session.is_complete());
	}

	#[tokio::test(start_paused = true)]
	async fn test_new_session_cancels_previous() {
		let harness = Harness::new();
		let mut events = harness.event_bus.subscribe();

		harness.tracker.start_tracking("first").await.unwrap();
		tokio::time::sleep(Duration::from_secs(15)).await;
		harness.tracker.start_tracking("second").await.unwrap();
		tokio::time::sleep(Duration::from_secs(60)).await;

		let events = drain(&mut events);
		assert!(events.contains(&TrackerEvent::SessionCancelled {
			order_id: "first".into(),
			pending: 3
		}));
		let first: Vec<_> = persisted(&events, "first")
			.into_iter()
			.map(|(status, _)| status)
			.collect();
		assert_eq!(first, vec![OrderStatus::Placed, OrderStatus::Preparing]);
		assert_eq!(persisted(&events, "second").len(), 5);

		let first = harness.tracker.get_status("first").await.unwrap().unwrap();
		assert_eq!(first.status, OrderStatus::Preparing);
		let second = harness.tracker.get_status("second").await.unwrap().unwrap();
		assert_eq!(second.status, OrderStatus::Delivered);
	}

	#[tokio::test(start_paused = true)]
	async fn test_overlapping_starts_keep_one_session() {
		let harness = Harness::with_storage(SlowStorage::new(Duration::from_millis(100)));
		let mut events = harness.event_bus.subscribe();

		let (a, b) = tokio::join!(
			harness.tracker.start_tracking("a"),
			harness.tracker.start_tracking("b")
		);
		a.unwrap();
		b.unwrap();
		assert_eq!(harness.tracker.current_session().unwrap().order_id(), "b");

		assert_eq!(harness.tracker.cancel(), 4);
		tokio::time::sleep(Duration::from_secs(60)).await;

		let events = drain(&mut events);
		assert!(events.contains(&TrackerEvent::SessionCancelled {
			order_id: "a".into(),
			pending: 4
		}));
		assert_eq!(persisted(&events, "a").len(), 1);
		assert_eq!(persisted(&events, "b").len(), 1);
		for id in ["a", "b"] {
			let record = harness.tracker.get_status(id).await.unwrap().unwrap();
			assert_eq!(record.status, OrderStatus::Placed);
		}
		tokio::time::timeout(Duration::from_secs(1), harness.tracker.wait_until_idle())
			.await
			.unwrap();
	}

	#[tokio::test(start_paused = true)]
	async fn test_abandoned_start_leaves_tracker_idle() {
		let harness = Harness::with_storage(SlowStorage::new(Duration::from_secs(10)));

		let started =
			tokio::time::timeout(Duration::from_secs(1), harness.tracker.start_tracking(ORDER))
				.await;
		assert!(started.is_err());
		assert!(harness.tracker.current_session().is_none());

		tokio::time::timeout(Duration::from_secs(1), harness.tracker.wait_until_idle())
			.await
			.unwrap();
		assert!(harness.tracker.get_status(ORDER).await.unwrap().is_none());
	}

	#[tokio::test(start_paused = true)]
	async fn test_records_stay_unique_per_id() {
		let harness = Harness::new();

		harness.tracker.start_tracking("a").await.unwrap();
		harness.tracker.start_tracking("b").await.unwrap();
		harness.tracker.start_tracking("a").await.unwrap();
		tokio::time::sleep(Duration::from_secs(46)).await;

		let records = harness.ledger.all_orders().await.unwrap();
		let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
		assert_eq!(ids, vec!["a", "b"]);
		assert_eq!(records[0].status, OrderStatus::Delivered);
		assert_eq!(records[1].status, OrderStatus::Placed);
	}

	#[tokio::test(start_paused = true)]
	async fn test_denied_permission_suppresses_display_only() {
		let harness = Harness::with_permission(Permission::Denied);
		let mut events = harness.event_bus.subscribe();

		harness.tracker.start_tracking(ORDER).await.unwrap();
		tokio::time::sleep(Duration::from_secs(46)).await;

		let record = harness.tracker.get_status(ORDER).await.unwrap().unwrap();
		assert_eq!(record.status, OrderStatus::Delivered);
		assert!(harness.notifier.shown().is_empty());
		assert_eq!(harness.notifier.permission_requests(), 1);

		let suppressed = drain(&mut events)
			.into_iter()
			.filter(|e| matches!(e, TrackerEvent::NotificationSuppressed { .. }))
			.count();
		assert_eq!(suppressed, 5);
	}

	#[tokio::test(start_paused = true)]
	async fn test_placed_write_failure_propagates() {
		let harness = Harness::with_storage(FailingStorage::writes());

		let err = harness.tracker.start_tracking(ORDER).await.unwrap_err();
		assert!(matches!(err, TrackerError::Ledger(_)));
		assert!(harness.tracker.current_session().is_none());
		assert!(harness.notifier.shown().is_empty());

		tokio::time::timeout(Duration::from_secs(1), harness.tracker.wait_until_idle())
			.await
			.unwrap();
	}

	#[tokio::test(start_paused = true)]
	async fn test_deferred_failure_skips_only_that_transition() {
		// Third write is the Ready transition.
		let harness = Harness::with_storage(FailingStorage::nth_write(3));
		let mut events = harness.event_bus.subscribe();

		harness.tracker.start_tracking(ORDER).await.unwrap();
		tokio::time::sleep(Duration::from_secs(46)).await;

		let statuses: Vec<_> = persisted(&drain(&mut events), ORDER)
			.into_iter()
			.map(|(status, _)| status)
			.collect();
		assert_eq!(
			statuses,
			vec![
				OrderStatus::Placed,
				OrderStatus::Preparing,
				OrderStatus::OnTheWay,
				OrderStatus::Delivered
			]
		);
		assert_eq!(harness.notifier.shown().len(), 4);
		assert_eq!(
			harness.tracker.get_status(ORDER).await.unwrap().unwrap().status,
			OrderStatus::Delivered
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_wait_until_idle_returns_after_delivery() {
		let harness = Harness::new();

		harness.tracker.start_tracking(ORDER).await.unwrap();
		tokio::time::timeout(Duration::from_secs(60), harness.tracker.wait_until_idle())
			.await
			.unwrap();

		assert!(harness.clock.now_ms() >= EPOCH + 45_000);
		assert_eq!(
			harness.tracker.get_status(ORDER).await.unwrap().unwrap().status,
			OrderStatus::Delivered
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_cancel_stops_pending_transitions() {
		let harness = Harness::new();

		harness.tracker.start_tracking(ORDER).await.unwrap();
		tokio::time::sleep(Duration::from_secs(25)).await;
		assert_eq!(harness.tracker.cancel(), 2);
		tokio::time::sleep(Duration::from_secs(30)).await;

		assert_eq!(
			harness.tracker.get_status(ORDER).await.unwrap().unwrap().status,
			OrderStatus::Ready
		);
		assert_eq!(harness.tracker.cancel(), 0);
		harness.tracker.wait_until_idle().await;
	}

	#[tokio::test(start_paused = true)]
	async fn test_continue_tracking_fires_remaining_at_original_offsets() {
		let harness = Harness::new();
		let mut events = harness.event_bus.subscribe();

		harness
			.tracker
			.continue_tracking(ORDER, OrderStatus::Preparing, Duration::from_secs(12));
		tokio::time::sleep(Duration::from_secs(40)).await;

		let writes = persisted(&drain(&mut events), ORDER);
		assert_eq!(
			writes,
			vec![
				(OrderStatus::Ready, EPOCH + 8_000),
				(OrderStatus::OnTheWay, EPOCH + 18_000),
				(OrderStatus::Delivered, EPOCH + 33_000),
			]
		);
		assert!(harness.tracker.current_session().unwrap().is_complete());
	}
}
