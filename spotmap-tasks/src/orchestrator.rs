//! Task orchestration.
//!
//! Every task key has at most one active worker. Running a key again
//! cancels the previous worker first. Each task gets two threads: the worker
//! itself and a supervisor that relays its messages, drives the lifecycle
//! and resolves the [`TaskHandle`] once the worker has posted its terminal
//! message and exited. Cancellation removes the task from the
//! active set immediately; the worker notices through its [`CancelToken`] or
//! is simply abandoned, and anything it posts afterwards is dropped.

use std::any::Any;
use std::collections::HashMap;
use std::mem;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};
use spotmap_core::CancelToken;
use uuid::Uuid;

use crate::error::TaskError;
use crate::protocol::{Command, LifecycleMonitor, TaskMessage, Worker, WorkerPort};
use crate::status::{LogStatus, StatusSink};

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// How often a supervisor checks for cancellation while waiting for messages.
    pub poll_interval: Duration,
    /// Prefix of worker thread names; the task key is appended.
    pub thread_name_prefix: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            thread_name_prefix: "spotmap-".to_string(),
        }
    }
}

impl OrchestratorConfig {
    /// Sets the cancellation poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}

type Factory<W> = dyn Fn() -> Result<W, String> + Send + Sync;

/// A kind of task: its key plus a way to create its worker.
pub struct TaskType<W> {
    key: String,
    factory: Box<Factory<W>>,
}

impl<W: Worker> TaskType<W> {
    /// Creates a task type. A factory error is reported as a spawn failure.
    pub fn new<F>(key: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<W, String> + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            factory: Box::new(factory),
        }
    }

    /// Key under which tasks of this type are tracked.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    fn create(&self) -> Result<W, TaskError> {
        (self.factory)().map_err(TaskError::SpawnFailure)
    }
}

impl<W> std::fmt::Debug for TaskType<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskType").field("key", &self.key).finish()
    }
}

enum Outcome<P> {
    Pending,
    Resolved(Result<P, TaskError>),
    Taken,
    Cancelled,
}

struct Shared<P> {
    outcome: Mutex<Outcome<P>>,
    changed: Condvar,
}

impl<P> Shared<P> {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(Outcome::Pending),
            changed: Condvar::new(),
        }
    }

    fn rejected(err: TaskError) -> Self {
        Self {
            outcome: Mutex::new(Outcome::Resolved(Err(err))),
            changed: Condvar::new(),
        }
    }
}

/// Type-erased cancellation of a handle's outcome.
trait Abort: Send + Sync {
    fn abort(&self);
}

impl<P: Send> Abort for Shared<P> {
    fn abort(&self) {
        let mut outcome = self.outcome.lock();
        if matches!(*outcome, Outcome::Pending) {
            *outcome = Outcome::Cancelled;
            self.changed.notify_all();
        }
    }
}

struct ActiveTask {
    id: Uuid,
    cancel: CancelToken,
    outcome: Arc<dyn Abort>,
}

struct Inner {
    tasks: RwLock<HashMap<String, ActiveTask>>,
    status: Arc<dyn StatusSink>,
    config: OrchestratorConfig,
}

impl Inner {
    /// Cancels the task under `key`, or only the task `id` if given.
    fn cancel(&self, key: &str, id: Option<Uuid>) -> bool {
        let task = {
            let mut tasks = self.tasks.write();
            let matches = tasks
                .get(key)
                .is_some_and(|task| id.is_none_or(|id| task.id == id));
            if !matches {
                return false;
            }
            tasks.remove(key)
        };
        let Some(task) = task else {
            return false;
        };

        task.cancel.cancel();
        task.outcome.abort();
        let active = self.tasks.read().len();
        log::debug!("cancelled task {key} ({})", task.id);
        self.status.on_cancel(active);
        true
    }

    /// Removes `key` if it still belongs to task `id`.
    fn remove_if(&self, key: &str, id: Uuid) -> bool {
        let mut tasks = self.tasks.write();
        if tasks.get(key).is_some_and(|task| task.id == id) {
            tasks.remove(key);
            true
        } else {
            false
        }
    }
}

fn failure_text(err: &TaskError) -> String {
    match err {
        TaskError::ComputationFailure(message) => format!("Operation failed: {message}"),
        _ => "Operation failed. See log for details.".to_string(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Pending result of a task.
///
/// Resolves with the payload or a [`TaskError`]. A cancelled task never
/// resolves: [`TaskHandle::try_take`] keeps returning `None` and
/// [`TaskHandle::is_cancelled`] reports it.
pub struct TaskHandle<P> {
    key: String,
    id: Uuid,
    shared: Arc<Shared<P>>,
    inner: Arc<Inner>,
}

impl<P> TaskHandle<P> {
    /// Task key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Unique id of this run.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Takes the outcome if the task has finished. Never blocks.
    pub fn try_take(&self) -> Option<Result<P, TaskError>> {
        take_resolved(&mut self.shared.outcome.lock())
    }

    /// Blocks until the task finishes or is cancelled.
    ///
    /// Returns `Err(TaskError::Cancelled)` for a cancelled task and
    /// `Err(TaskError::Taken)` if the outcome was already taken.
    pub fn wait(&self) -> Result<P, TaskError> {
        let mut outcome = self.shared.outcome.lock();
        while matches!(*outcome, Outcome::Pending) {
            self.shared.changed.wait(&mut outcome);
        }
        settle(&mut outcome).unwrap_or(Err(TaskError::Taken))
    }

    /// Like [`TaskHandle::wait`], giving up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<P, TaskError>> {
        let deadline = Instant::now() + timeout;
        let mut outcome = self.shared.outcome.lock();
        while matches!(*outcome, Outcome::Pending) {
            if self
                .shared
                .changed
                .wait_until(&mut outcome, deadline)
                .timed_out()
            {
                break;
            }
        }
        settle(&mut outcome)
    }

    /// Cancels this run. Has no effect once it has finished.
    pub fn cancel(&self) -> bool {
        self.inner.cancel(&self.key, Some(self.id))
    }

    /// True if the task was cancelled before finishing.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(*self.shared.outcome.lock(), Outcome::Cancelled)
    }

    /// True once the task resolved or was cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        !matches!(*self.shared.outcome.lock(), Outcome::Pending)
    }
}

impl<P> std::fmt::Debug for TaskHandle<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Moves a resolved outcome out, leaving `Taken` behind.
fn take_resolved<P>(outcome: &mut Outcome<P>) -> Option<Result<P, TaskError>> {
    if !matches!(*outcome, Outcome::Resolved(_)) {
        return None;
    }
    match mem::replace(outcome, Outcome::Taken) {
        Outcome::Resolved(result) => Some(result),
        _ => None,
    }
}

/// Outcome seen by a waiter once the task is no longer pending.
fn settle<P>(outcome: &mut Outcome<P>) -> Option<Result<P, TaskError>> {
    match *outcome {
        Outcome::Pending => None,
        Outcome::Cancelled => Some(Err(TaskError::Cancelled)),
        Outcome::Taken => Some(Err(TaskError::Taken)),
        Outcome::Resolved(_) => take_resolved(outcome),
    }
}

/// Runs tasks on worker threads, one active task per key.
pub struct TaskOrchestrator {
    inner: Arc<Inner>,
}

impl Default for TaskOrchestrator {
    fn default() -> Self {
        Self::new(Arc::new(LogStatus))
    }
}

impl TaskOrchestrator {
    /// Creates an orchestrator reporting to `status`.
    #[must_use]
    pub fn new(status: Arc<dyn StatusSink>) -> Self {
        Self::with_config(status, OrchestratorConfig::default())
    }

    /// Creates an orchestrator with explicit settings.
    #[must_use]
    pub fn with_config(status: Arc<dyn StatusSink>, config: OrchestratorConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                tasks: RwLock::new(HashMap::new()),
                status,
                config,
            }),
        }
    }

    /// Starts a task, cancelling any task already running under the same key.
    ///
    /// Always returns a handle; if the worker cannot be started the handle
    /// is already rejected with [`TaskError::SpawnFailure`].
    pub fn run<W: Worker>(&self, task_type: &TaskType<W>, args: W::Args) -> TaskHandle<W::Payload> {
        let key = task_type.key().to_string();
        if self.cancel(&key) {
            log::debug!("replacing running task {key}");
        }

        let id = Uuid::new_v4();
        self.inner
            .status
            .set_status(&format!("Initializing runtime for task {key}..."));

        let shared = match self.spawn(task_type, &key, id, args) {
            Ok(shared) => shared,
            Err(err) => {
                log::error!("task {key}: {err}");
                self.inner.status.set_status("");
                self.inner.status.set_error(&failure_text(&err));
                Arc::new(Shared::rejected(err))
            }
        };

        TaskHandle {
            key,
            id,
            shared,
            inner: Arc::clone(&self.inner),
        }
    }

    fn spawn<W: Worker>(
        &self,
        task_type: &TaskType<W>,
        key: &str,
        id: Uuid,
        args: W::Args,
    ) -> Result<Arc<Shared<W::Payload>>, TaskError> {
        let worker = task_type.create()?;
        let (events_tx, events_rx) = mpsc::channel();
        let (commands_tx, commands_rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let port = WorkerPort::new(events_tx, commands_rx, cancel.clone());
        let shared = Arc::new(Shared::new());
        let prefix = &self.inner.config.thread_name_prefix;

        self.inner.tasks.write().insert(
            key.to_string(),
            ActiveTask {
                id,
                cancel: cancel.clone(),
                outcome: Arc::clone(&shared) as Arc<dyn Abort>,
            },
        );

        let worker_thread = thread::Builder::new()
            .name(format!("{prefix}{key}"))
            .spawn(move || worker.run(port));
        let worker_thread = match worker_thread {
            Ok(handle) => handle,
            Err(err) => {
                self.inner.remove_if(key, id);
                return Err(TaskError::SpawnFailure(format!("worker thread: {err}")));
            }
        };

        let supervisor = Supervisor {
            key: key.to_string(),
            id,
            inner: Arc::clone(&self.inner),
            shared: Arc::clone(&shared),
            events: events_rx,
            commands: commands_tx,
            cancel: cancel.clone(),
            worker: Some(worker_thread),
            args: Some(args),
            monitor: LifecycleMonitor::new(),
            started: Instant::now(),
        };
        let spawned = thread::Builder::new()
            .name(format!("{prefix}{key}-supervisor"))
            .spawn(move || supervisor.run());
        if let Err(err) = spawned {
            cancel.cancel();
            self.inner.remove_if(key, id);
            return Err(TaskError::SpawnFailure(format!("supervisor thread: {err}")));
        }

        log::debug!("spawned task {key} ({id})");
        Ok(shared)
    }

    /// Cancels the active task under `key`. Returns false if there was none.
    pub fn cancel(&self, key: &str) -> bool {
        self.inner.cancel(key, None)
    }

    /// Cancels every active task.
    pub fn cancel_all(&self) {
        let keys: Vec<String> = self.inner.tasks.read().keys().cloned().collect();
        for key in keys {
            self.cancel(&key);
        }
    }

    /// Number of tasks started and not yet finished or cancelled.
    #[must_use]
    pub fn active_task_count(&self) -> usize {
        self.inner.tasks.read().len()
    }

    /// True if a task is active under `key`.
    #[must_use]
    pub fn is_active(&self, key: &str) -> bool {
        self.inner.tasks.read().contains_key(key)
    }
}

impl Drop for TaskOrchestrator {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Relays one worker's messages and resolves its handle.
struct Supervisor<A, P> {
    key: String,
    id: Uuid,
    inner: Arc<Inner>,
    shared: Arc<Shared<P>>,
    events: Receiver<TaskMessage<P>>,
    commands: Sender<Command<A>>,
    cancel: CancelToken,
    worker: Option<JoinHandle<()>>,
    args: Option<A>,
    monitor: LifecycleMonitor,
    started: Instant,
}

impl<A, P> Supervisor<A, P> {
    fn run(mut self) {
        let poll_interval = self.inner.config.poll_interval;
        loop {
            if self.cancel.is_cancelled() {
                self.monitor.cancel();
                // The worker may already be gone.
                let _ = self.commands.send(Command::Cancel);
                log::debug!("supervisor for {} ({}) stopped", self.key, self.id);
                return;
            }

            let outcome = match self.events.recv_timeout(poll_interval) {
                Ok(message) => match self.handle(message) {
                    Some(outcome) if self.monitor.state().is_terminal() => self.drain(outcome),
                    other => other,
                },
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => {
                    if self.cancel.is_cancelled() {
                        continue;
                    }
                    Some(Err(self.worker_exit()))
                }
            };
            if let Some(outcome) = outcome {
                self.finish(outcome);
                return;
            }
        }
    }

    fn handle(&mut self, message: TaskMessage<P>) -> Option<Result<P, TaskError>> {
        if let Err(violation) = self.monitor.observe(&message) {
            log::warn!("task {}: {violation}", self.key);
            return Some(Err(violation));
        }

        match message {
            TaskMessage::Ready => {
                self.inner
                    .status
                    .set_status(&format!("{} task is ready to work", self.key));
                if let Some(args) = self.args.take() {
                    if self.commands.send(Command::Setup(args)).is_err() {
                        return Some(Err(TaskError::ProtocolViolation(
                            "worker stopped listening before setup".to_string(),
                        )));
                    }
                }
                self.monitor.setup_sent().err().map(Err)
            }
            TaskMessage::Working { message } => {
                if !self.cancel.is_cancelled() {
                    self.inner.status.set_status(&message);
                }
                None
            }
            TaskMessage::Completed(payload) => Some(Ok(payload)),
            TaskMessage::Failed { message } => Some(Err(TaskError::ComputationFailure(message))),
        }
    }

    /// Holds a terminal outcome until the worker has exited.
    ///
    /// Anything posted after the terminal message, such as a second
    /// `completed`, turns the outcome into a protocol violation. Returns
    /// `None` if the task is cancelled meanwhile.
    fn drain(&mut self, outcome: Result<P, TaskError>) -> Option<Result<P, TaskError>> {
        let poll_interval = self.inner.config.poll_interval;
        while !self.cancel.is_cancelled() {
            match self.events.recv_timeout(poll_interval) {
                Ok(message) => {
                    let violation = match self.monitor.observe(&message) {
                        Err(violation) => violation,
                        Ok(_) => TaskError::ProtocolViolation(format!(
                            "'{}' message after the terminal message",
                            message.tag()
                        )),
                    };
                    log::warn!("task {}: {violation}", self.key);
                    return Some(Err(violation));
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Some(match self.join_worker() {
                        Some(panicked) => Err(panicked),
                        None => outcome,
                    });
                }
            }
        }
        None
    }

    fn worker_exit(&mut self) -> TaskError {
        self.join_worker().unwrap_or_else(|| {
            log::warn!("task {} worker exited without a terminal message", self.key);
            TaskError::ProtocolViolation("worker exited without a terminal message".to_string())
        })
    }

    /// Joins the worker thread, returning the failure if it panicked.
    fn join_worker(&mut self) -> Option<TaskError> {
        let panic = self.worker.take()?.join().err()?;
        let message = panic_message(&*panic);
        log::error!("task {} worker panicked: {message}", self.key);
        Some(TaskError::ComputationFailure(format!(
            "worker panicked: {message}"
        )))
    }

    fn finish(self, outcome: Result<P, TaskError>) {
        if outcome.is_err() {
            self.cancel.cancel();
        }

        let mut slot = self.shared.outcome.lock();
        if !matches!(*slot, Outcome::Pending) || !self.inner.remove_if(&self.key, self.id) {
            log::debug!("discarding outcome of cancelled task {}", self.key);
            return;
        }

        let status = &self.inner.status;
        status.set_status("");
        match &outcome {
            Ok(_) => log::info!(
                "Task {} completed in {:.3} sec",
                self.key,
                self.started.elapsed().as_secs_f64()
            ),
            Err(err) => status.set_error(&failure_text(err)),
        }
        *slot = Outcome::Resolved(outcome);
        self.shared.changed.notify_all();
    }
}
