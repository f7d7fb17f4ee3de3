//! Startup and shutdown of the tracker engine.

use super::{EngineError, TrackerEngine};
use crate::recovery::RecoveryReport;

impl TrackerEngine {
	/// Resumes the latest in-progress order, if there is one.
	pub async fn initialize(&self) -> Result<RecoveryReport, EngineError> {
		tracing::info!(tracker_id = %self.config.tracker.id, "Initializing order tracker");
		self.recovery
			.resume_on_load()
			.await
			.map_err(|e| EngineError::Recovery(e.to_string()))
	}

	/// Cancels the active session. Returns how many transitions were still
	/// pending.
	pub async fn shutdown(&self) -> Result<usize, EngineError> {
		tracing::info!("Shutting down order tracker");
		Ok(self.tracker.cancel())
	}
}
