//! Progress events pushed by the optimization service.
//!
//! The server sends one JSON text frame per status poll with the shape
//! `{"status": "...", "progress": 42, "message": "...", "result": ...}`.
//! This module deserializes them into a typed [`ProgressEvent`].

use serde::{Deserialize, Serialize};

use crate::types::ResultPayload;

/// Lifecycle status of a remote task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Accepted but not started yet.
    Pending,

    /// Actively computing. Older servers report this as `processing`.
    #[serde(alias = "processing")]
    Running,

    /// Finished; the event carries the result.
    Completed,

    /// Finished with an error; the message describes it.
    Failed,

    /// The server does not know the task id.
    NotFound,
}

impl TaskStatus {
    /// Whether this status ends the task.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::NotFound
        )
    }
}

/// One status update for a task.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProgressEvent {
    pub status: TaskStatus,
    /// Completion percentage. Advisory only.
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub message: String,
    /// Present only on `completed`.
    #[serde(default)]
    pub result: Option<ResultPayload>,
}

impl ProgressEvent {
    /// Progress clamped to `0.0..=100.0` for display.
    pub fn percent(&self) -> f64 {
        if self.progress.is_finite() {
            self.progress.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

/// Parse a progress stream text frame into a typed event.
///
/// Returns `Err` for malformed JSON or unknown `status` values.
/// Callers should log and continue.
pub fn parse_event(text: &str) -> Result<ProgressEvent, serde_json::Error> {
    serde_json::from_str(text)
}
