//! Progress stream session: one subscription bound to one task id.
//!
//! A [`StreamSession`] receives raw frames from its connection driver
//! (see [`crate::client`]) and runs the session state machine over
//! them:
//!
//! ```text
//! Connecting -> Open -> { Completed | Failed | ClosedByPeer | ClosedByCaller }
//! ```
//!
//! Every terminal transition releases the transport. Once terminal, the
//! session delivers nothing further: frames still queued or arriving
//! later are discarded.

use std::time::Duration;

use gemggark_core::progress::{parse_event, TaskStatus};
use gemggark_core::types::TaskId;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::events::{ProgressUpdate, SessionEvent};

/// User-facing message for an unexpected transport failure. The
/// underlying cause is only logged.
pub const CONNECTION_LOST_MESSAGE: &str =
    "Lost the live connection to the optimization service. Please try again.";

/// User-facing message when the server closes before a terminal event.
pub const CLOSED_EARLY_MESSAGE: &str =
    "The optimization service closed the progress stream before the task finished.";

/// User-facing message when the idle watchdog fires.
pub fn stalled_message(limit: Duration) -> String {
    format!("No progress received for {}s.", limit.as_secs_f64())
}

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    Open,
    Completed,
    Failed,
    ClosedByPeer,
    ClosedByCaller,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionPhase::Connecting | SessionPhase::Open)
    }
}

/// Raw input from the connection driver, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Frame {
    /// The WebSocket handshake succeeded.
    Opened,
    /// A UTF-8 text frame, not yet parsed.
    Text(String),
    /// The peer closed the connection or the stream ended.
    PeerClosed,
    /// Connecting or receiving failed; carries the cause for logging.
    TransportError(String),
    /// Nothing arrived within the idle timeout.
    Stalled(Duration),
}

/// A live progress subscription for one task.
///
/// Owned exclusively by the page controller for the duration of a
/// task. Dropping the session closes it.
pub struct StreamSession {
    task_id: TaskId,
    phase: SessionPhase,
    frames: mpsc::UnboundedReceiver<Frame>,
    /// Tells the connection driver to close the socket.
    transport: CancellationToken,
    idle_timeout: Option<Duration>,
}

impl StreamSession {
    pub(crate) fn new(
        task_id: TaskId,
        frames: mpsc::UnboundedReceiver<Frame>,
        transport: CancellationToken,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            task_id,
            phase: SessionPhase::Connecting,
            frames,
            transport,
            idle_timeout,
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Whether the session can still deliver events.
    pub fn is_live(&self) -> bool {
        !self.phase.is_terminal()
    }

    /// Wait for the next event of this session.
    ///
    /// Malformed messages are logged and skipped. Returns `None` once the
    /// session is terminal. Cancel-safe: dropping the future loses no frame.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        while self.is_live() {
            let frame = self.recv_frame().await;
            if let Some(event) = self.handle_frame(frame) {
                return Some(event);
            }
        }
        None
    }

    /// Close the session from the caller's side.
    ///
    /// Valid in any phase, including before the connection opens. The
    /// transport is released and no further events are delivered by the
    /// time this returns. Repeated calls, and calls after the session
    /// already ended on its own, are no-ops.
    pub fn close(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        tracing::info!(task_id = %self.task_id, phase = ?self.phase, "Closing progress stream");
        self.phase = SessionPhase::ClosedByCaller;
        self.release_transport();
    }

    // ---- state machine ----

    async fn recv_frame(&mut self) -> Frame {
        let received = match self.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.frames.recv()).await {
                Ok(received) => received,
                Err(_) => return Frame::Stalled(limit),
            },
            None => self.frames.recv().await,
        };
        // The driver drops its sender when the socket is gone.
        received.unwrap_or(Frame::PeerClosed)
    }

    /// Apply one frame to the session. Returns the event to deliver, if any.
    pub(crate) fn handle_frame(&mut self, frame: Frame) -> Option<SessionEvent> {
        if self.phase.is_terminal() {
            tracing::debug!(task_id = %self.task_id, phase = ?self.phase, "Discarding frame after session end");
            return None;
        }

        match frame {
            Frame::Opened => {
                if self.phase != SessionPhase::Connecting {
                    return None;
                }
                tracing::info!(task_id = %self.task_id, "Progress stream connected");
                self.phase = SessionPhase::Open;
                Some(SessionEvent::Connected)
            }
            Frame::Text(text) => self.handle_text(&text),
            Frame::PeerClosed => {
                tracing::warn!(task_id = %self.task_id, "Progress stream closed before a terminal event");
                self.finish(SessionPhase::ClosedByPeer);
                Some(SessionEvent::TransportError(CLOSED_EARLY_MESSAGE.to_string()))
            }
            Frame::TransportError(cause) => {
                tracing::error!(task_id = %self.task_id, error = %cause, "Progress stream transport error");
                self.finish(SessionPhase::Failed);
                Some(SessionEvent::TransportError(CONNECTION_LOST_MESSAGE.to_string()))
            }
            Frame::Stalled(limit) => {
                tracing::warn!(task_id = %self.task_id, timeout = ?limit, "Progress stream stalled");
                self.finish(SessionPhase::Failed);
                Some(SessionEvent::TransportError(stalled_message(limit)))
            }
        }
    }

    fn handle_text(&mut self, text: &str) -> Option<SessionEvent> {
        let event = match parse_event(text) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    task_id = %self.task_id,
                    error = %e,
                    raw_message = %text,
                    "Failed to parse progress message",
                );
                return None;
            }
        };

        if self.phase == SessionPhase::Connecting {
            self.phase = SessionPhase::Open;
        }

        match event.status {
            TaskStatus::Pending | TaskStatus::Running => {
                let percent = event.percent();
                tracing::debug!(
                    task_id = %self.task_id,
                    status = ?event.status,
                    progress = percent,
                    message = %event.message,
                    "Task progress",
                );
                Some(SessionEvent::Progress(ProgressUpdate {
                    status: event.status,
                    progress: percent,
                    message: event.message,
                    received_at: chrono::Utc::now(),
                }))
            }
            TaskStatus::Completed => {
                tracing::info!(task_id = %self.task_id, "Task completed");
                self.finish(SessionPhase::Completed);
                Some(SessionEvent::Completed(
                    event.result.unwrap_or(serde_json::Value::Null),
                ))
            }
            TaskStatus::Failed | TaskStatus::NotFound => {
                tracing::warn!(
                    task_id = %self.task_id,
                    status = ?event.status,
                    message = %event.message,
                    "Task failed",
                );
                self.finish(SessionPhase::Failed);
                let message = if event.message.is_empty() {
                    format!("Task {} failed", self.task_id)
                } else {
                    event.message
                };
                Some(SessionEvent::Failed(message))
            }
        }
    }

    fn finish(&mut self, phase: SessionPhase) {
        self.phase = phase;
        self.release_transport();
    }

    /// Stop the driver and refuse any frame it still tries to send.
    fn release_transport(&mut self) {
        self.transport.cancel();
        self.frames.close();
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("task_id", &self.task_id)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}
