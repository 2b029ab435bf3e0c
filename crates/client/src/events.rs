//! Events a progress stream session delivers to its owner.
//!
//! These are produced by [`StreamSession`](crate::session::StreamSession)
//! after interpreting raw WebSocket frames, and consumed by the page
//! controller.

use gemggark_core::progress::TaskStatus;
use gemggark_core::types::{ResultPayload, Timestamp};

/// Advisory progress for the task currently running.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub status: TaskStatus,
    /// Completion percentage, clamped to 0-100.
    pub progress: f64,
    pub message: String,
    pub received_at: Timestamp,
}

/// A single outcome of one session, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The WebSocket handshake completed.
    Connected,

    /// The task is pending or running.
    Progress(ProgressUpdate),

    /// The task finished; carries the result verbatim.
    Completed(ResultPayload),

    /// The server reported the task as failed.
    Failed(String),

    /// The connection broke, closed early, or went silent.
    TransportError(String),
}

impl SessionEvent {
    /// Whether this event ends its session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::Completed(_) | SessionEvent::Failed(_) | SessionEvent::TransportError(_)
        )
    }
}
