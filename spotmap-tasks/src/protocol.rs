//! Worker lifecycle protocol.
//!
//! A worker announces itself with [`TaskMessage::Ready`], receives its
//! arguments in [`Command::Setup`], may then post any number of
//! [`TaskMessage::Working`] updates, and ends with exactly one
//! [`TaskMessage::Completed`] or [`TaskMessage::Failed`]. A cancelled worker
//! simply stops posting.
//!
//! On the wire every message is an object tagged by its `status` field:
//!
//! ```json
//! { "status": "ready" }
//! { "status": "working", "message": "Mapping: 10%" }
//! { "status": "completed", "closest_spot_indices": [0, -1] }
//! { "status": "failed", "message": "invalid geometry: ..." }
//! ```

use std::sync::mpsc::{Receiver, Sender};

use serde::{Deserialize, Serialize};
use spotmap_core::{CancelToken, Progress};

use crate::error::TaskError;

/// Worker → orchestrator message.
///
/// `P` is the task's payload and must serialise as a struct so that its
/// fields sit next to the `status` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskMessage<P> {
    /// The worker is up and waiting for its arguments.
    Ready,
    /// Progress update for the status line.
    Working {
        /// Human-readable status text.
        message: String,
    },
    /// The computation finished; carries the result by value.
    Completed(P),
    /// The computation failed.
    Failed {
        /// Failure reason.
        message: String,
    },
}

impl<P> TaskMessage<P> {
    /// Wire tag of the message.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            TaskMessage::Ready => "ready",
            TaskMessage::Working { .. } => "working",
            TaskMessage::Completed(_) => "completed",
            TaskMessage::Failed { .. } => "failed",
        }
    }

    /// True for `Completed` and `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskMessage::Completed(_) | TaskMessage::Failed { .. })
    }
}

/// Orchestrator → worker command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command<A> {
    /// Arguments for the computation, sent once after `Ready`.
    Setup(A),
    /// Stop without posting anything further.
    Cancel,
}

/// Lifecycle of a task as seen by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// Thread started, `Ready` not yet received.
    #[default]
    Spawned,
    /// `Ready` received, arguments not yet sent.
    Ready,
    /// Arguments sent; `Working` updates are allowed.
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl LifecycleState {
    /// True once no further message is accepted.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LifecycleState::Completed | LifecycleState::Failed | LifecycleState::Cancelled
        )
    }
}

/// Validates the order of messages posted by one worker.
#[derive(Debug, Default)]
pub struct LifecycleMonitor {
    state: LifecycleState,
}

impl LifecycleMonitor {
    /// Creates a monitor in [`LifecycleState::Spawned`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Applies an incoming message.
    ///
    /// Returns the new state, or a protocol violation if the message is not
    /// allowed in the current state. A violation leaves the state unchanged.
    pub fn observe<P>(&mut self, message: &TaskMessage<P>) -> Result<LifecycleState, TaskError> {
        use LifecycleState as S;

        let next = match (self.state, message) {
            (S::Spawned, TaskMessage::Ready) => S::Ready,
            (S::Running, TaskMessage::Working { .. }) => S::Running,
            (S::Running, TaskMessage::Completed(_)) => S::Completed,
            (S::Running, TaskMessage::Failed { .. }) => S::Failed,
            (state, message) => {
                return Err(TaskError::ProtocolViolation(format!(
                    "unexpected '{}' message while {state:?}",
                    message.tag()
                )))
            }
        };
        self.state = next;
        Ok(next)
    }

    /// Records that the arguments were handed to the worker.
    pub fn setup_sent(&mut self) -> Result<(), TaskError> {
        if self.state != LifecycleState::Ready {
            return Err(TaskError::ProtocolViolation(format!(
                "setup sent while {:?}",
                self.state
            )));
        }
        self.state = LifecycleState::Running;
        Ok(())
    }

    /// Records cancellation; ignored once terminal.
    pub fn cancel(&mut self) {
        if !self.state.is_terminal() {
            self.state = LifecycleState::Cancelled;
        }
    }
}

/// A computation that runs on its own thread and talks through a [`WorkerPort`].
pub trait Worker: Send + 'static {
    /// Arguments delivered with [`Command::Setup`].
    type Args: Send + 'static;
    /// Result carried by [`TaskMessage::Completed`].
    type Payload: Send + 'static;

    /// Runs the worker to completion on the current thread.
    fn run(self, port: WorkerPort<Self::Args, Self::Payload>);
}

/// Worker end of the task channels.
pub struct WorkerPort<A, P> {
    events: Sender<TaskMessage<P>>,
    commands: Receiver<Command<A>>,
    cancel: CancelToken,
}

impl<A, P> WorkerPort<A, P> {
    pub(crate) fn new(
        events: Sender<TaskMessage<P>>,
        commands: Receiver<Command<A>>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            events,
            commands,
            cancel,
        }
    }

    /// Posts a raw message. Returns false if nobody listens any more,
    /// which is the case once the task was cancelled or resolved.
    pub fn post(&self, message: TaskMessage<P>) -> bool {
        let tag = message.tag();
        let delivered = self.events.send(message).is_ok();
        if !delivered {
            log::trace!("dropped late '{tag}' message");
        }
        delivered
    }

    /// Announces that the worker is waiting for arguments.
    pub fn ready(&self) -> bool {
        self.post(TaskMessage::Ready)
    }

    /// Blocks until the arguments arrive. `None` if the task was cancelled
    /// first.
    pub fn recv_setup(&self) -> Option<A> {
        match self.commands.recv() {
            Ok(Command::Setup(args)) => Some(args),
            Ok(Command::Cancel) | Err(_) => None,
        }
    }

    /// Posts a progress update.
    pub fn working(&self, message: impl Into<String>) -> bool {
        self.post(TaskMessage::Working {
            message: message.into(),
        })
    }

    /// Posts the result and closes the port.
    pub fn complete(self, payload: P) {
        self.post(TaskMessage::Completed(payload));
    }

    /// Posts a failure and closes the port.
    pub fn fail(self, message: impl Into<String>) {
        self.post(TaskMessage::Failed {
            message: message.into(),
        });
    }

    /// Cancellation flag shared with the orchestrator.
    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Progress sink that forwards reports as `Working` messages.
    #[must_use]
    pub fn progress(&self) -> PortProgress<P> {
        PortProgress {
            events: self.events.clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// Runs the whole lifecycle around `compute`.
    ///
    /// Posts `Ready`, waits for the arguments, runs `compute` and posts its
    /// outcome. A computation that stops with `Error::Cancelled` posts
    /// nothing.
    pub fn serve<F>(self, compute: F)
    where
        F: FnOnce(A, &PortProgress<P>) -> spotmap_core::Result<P>,
    {
        self.ready();
        let Some(args) = self.recv_setup() else {
            log::debug!("worker cancelled before setup");
            return;
        };
        let progress = self.progress();
        match compute(args, &progress) {
            Ok(payload) => self.complete(payload),
            Err(err) if err.is_cancelled() => log::debug!("worker computation cancelled"),
            Err(err) => self.fail(err.to_string()),
        }
    }
}

/// [`Progress`] implementation backed by a worker's channel.
pub struct PortProgress<P> {
    events: Sender<TaskMessage<P>>,
    cancel: CancelToken,
}

impl<P> Progress for PortProgress<P> {
    fn report(&self, message: String) {
        if !self.cancel.is_cancelled() {
            // A closed channel only means nobody waits for this task any more.
            let _ = self.events.send(TaskMessage::Working { message });
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
