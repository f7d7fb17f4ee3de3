//! Broadcast channel for tracker events.
//!
//! Every subscriber receives every event published after it subscribed.
//! Publishing never blocks; slow subscribers lag and lose the oldest events.

use foodie_types::TrackerEvent;
use tokio::sync::broadcast;

/// Event bus shared by the tracker, the recovery service and any observers.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<TrackerEvent>,
}

impl EventBus {
	/// Creates a bus buffering up to `capacity` events per subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Subscribes to events published from now on.
	pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to all current subscribers.
	///
	/// Fails only when nobody is subscribed, which callers usually ignore.
	pub fn publish(
		&self,
		event: TrackerEvent,
	) -> Result<usize, broadcast::error::SendError<TrackerEvent>> {
		self.sender.send(event)
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(256)
	}
}
