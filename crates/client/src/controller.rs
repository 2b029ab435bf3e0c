//! Page state controller.
//!
//! [`PageController`] is the only component a host talks to. It owns the
//! submission client, the session opener and, while a task runs, the one
//! live [`StreamSession`]. Hosts read its state and issue two commands:
//! [`submit`](PageController::submit) and [`cancel`](PageController::cancel).
//!
//! ```text
//! Input --submit--> Loading(task_id) --completed--> Result(payload)
//!                        |
//!                        +--failed / transport error / cancel--> Input
//! ```
//!
//! All methods take `&mut self`, so events are applied one at a time in
//! the order the session yields them.

use gemggark_core::request::RequestPayload;
use gemggark_core::types::{ResultPayload, TaskId};

use crate::api::{SubmissionError, TaskApi, TaskSubmitter};
use crate::client::{ProgressStreamClient, SessionOpener};
use crate::events::{ProgressUpdate, SessionEvent};
use crate::session::StreamSession;

/// Controller wired to the real HTTP and WebSocket clients.
pub type LivePageController = PageController<TaskApi, ProgressStreamClient>;

/// Externally observable mode of the page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageState {
    Input,
    Loading { task_id: TaskId },
    Result { payload: ResultPayload },
}

/// Errors surfaced to the host. All of them leave the controller in
/// [`PageState::Input`] except `Busy`, which leaves it untouched.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// `submit` was called while a task is already loading.
    #[error("A task is already in progress")]
    Busy,

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    /// The progress stream broke before the task finished.
    #[error("{0}")]
    StreamTransport(String),

    /// The server reported the task as failed.
    #[error("{0}")]
    TaskFailed(String),
}

impl ControllerError {
    /// Message suitable for showing to the user as-is.
    pub fn display_message(&self) -> String {
        self.to_string()
    }
}

/// What applying one session event did to the controller.
#[derive(Debug)]
pub enum Transition {
    /// The stream connected; still loading.
    Connected,
    /// Progress changed; still loading.
    Progress(ProgressUpdate),
    /// Entered [`PageState::Result`].
    Completed,
    /// Returned to [`PageState::Input`] with an error.
    Failed(ControllerError),
    /// The event did not belong to the current task and was dropped.
    Discarded,
}

/// Three-state page machine composing submission and progress streaming.
pub struct PageController<S, O> {
    submitter: S,
    opener: O,
    state: PageState,
    /// Present exactly while `state` is `Loading`.
    session: Option<StreamSession>,
    progress: Option<ProgressUpdate>,
    error_message: Option<String>,
}

impl<S, O> PageController<S, O>
where
    S: TaskSubmitter,
    O: SessionOpener,
{
    pub fn new(submitter: S, opener: O) -> Self {
        Self {
            submitter,
            opener,
            state: PageState::Input,
            session: None,
            progress: None,
            error_message: None,
        }
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    /// Latest progress of the running task, if any arrived yet.
    pub fn progress(&self) -> Option<&ProgressUpdate> {
        self.progress.as_ref()
    }

    /// Message of the last error that returned the page to `Input`.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Task id of the running task, if loading.
    pub fn current_task(&self) -> Option<&TaskId> {
        match &self.state {
            PageState::Loading { task_id } => Some(task_id),
            _ => None,
        }
    }

    pub fn has_live_session(&self) -> bool {
        self.session.as_ref().is_some_and(StreamSession::is_live)
    }

    /// Submit a job and start following its progress.
    ///
    /// On success the page is `Loading` with a session bound to the new
    /// task id. On failure the page stays in `Input` and no session is
    /// opened. Rejected with [`ControllerError::Busy`] while loading.
    /// Submitting from `Result` starts a fresh job.
    pub async fn submit(&mut self, payload: &RequestPayload) -> Result<TaskId, ControllerError> {
        if matches!(self.state, PageState::Loading { .. }) {
            tracing::warn!(task_id = ?self.current_task(), "Rejecting submit while a task is loading");
            return Err(ControllerError::Busy);
        }

        self.state = PageState::Input;
        self.progress = None;
        self.error_message = None;

        let task_id = match self.submitter.submit(payload).await {
            Ok(task_id) => task_id,
            Err(e) => {
                let err = ControllerError::from(e);
                self.error_message = Some(err.display_message());
                return Err(err);
            }
        };

        self.session = Some(self.opener.open(&task_id));
        self.state = PageState::Loading {
            task_id: task_id.clone(),
        };
        tracing::info!(task_id = %task_id, "Page entered loading state");

        Ok(task_id)
    }

    /// Wait for the running session's next event and apply it.
    ///
    /// Returns `None` when no session is live. Cancel-safe.
    pub async fn next_transition(&mut self) -> Option<Transition> {
        let session = self.session.as_mut()?;
        let event = session.next_event().await;
        let task_id = session.task_id().clone();

        match event {
            Some(event) => Some(self.apply(&task_id, event)),
            None => {
                self.session = None;
                None
            }
        }
    }

    /// Apply an event emitted by the session bound to `task_id`.
    ///
    /// Events for any task other than the one currently loading are
    /// discarded, so a late event from an abandoned session can never
    /// move the page.
    pub fn apply(&mut self, task_id: &TaskId, event: SessionEvent) -> Transition {
        match &self.state {
            PageState::Loading { task_id: current } if current == task_id => {}
            _ => {
                tracing::debug!(task_id = %task_id, ?event, "Discarding event for inactive task");
                return Transition::Discarded;
            }
        }

        match event {
            SessionEvent::Connected => Transition::Connected,
            SessionEvent::Progress(update) => {
                self.progress = Some(update.clone());
                Transition::Progress(update)
            }
            SessionEvent::Completed(payload) => {
                self.teardown_session();
                self.state = PageState::Result { payload };
                tracing::info!(task_id = %task_id, "Page entered result state");
                Transition::Completed
            }
            SessionEvent::Failed(message) => {
                self.return_to_input(ControllerError::TaskFailed(message))
            }
            SessionEvent::TransportError(message) => {
                self.return_to_input(ControllerError::StreamTransport(message))
            }
        }
    }

    /// Abandon the running task.
    ///
    /// The session is closed before the page returns to `Input`, so
    /// nothing the old stream delivers afterwards can reach the page.
    /// Returns `false` when there was nothing to cancel.
    pub fn cancel(&mut self) -> bool {
        let PageState::Loading { task_id } = &self.state else {
            return false;
        };
        tracing::info!(task_id = %task_id, "Cancelling running task");

        self.teardown_session();
        self.state = PageState::Input;
        self.progress = None;
        true
    }

    fn return_to_input(&mut self, err: ControllerError) -> Transition {
        self.teardown_session();
        self.state = PageState::Input;
        self.progress = None;
        self.error_message = Some(err.display_message());
        tracing::warn!(error = %err, "Page returned to input state");
        Transition::Failed(err)
    }

    fn teardown_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
    }
}
