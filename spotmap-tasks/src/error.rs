//! Error types for spotmap-tasks.

use thiserror::Error;

/// Result type alias for task operations.
pub type Result<T> = std::result::Result<T, TaskError>;

/// Ways a task can end without a payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The worker could not be created or its thread could not be started.
    #[error("failed to spawn worker: {0}")]
    SpawnFailure(String),

    /// The worker sent messages out of lifecycle order.
    #[error("worker protocol violation: {0}")]
    ProtocolViolation(String),

    /// The computation itself failed.
    #[error("computation failed: {0}")]
    ComputationFailure(String),

    /// The task was cancelled before it finished.
    #[error("task cancelled")]
    Cancelled,

    /// The outcome was already taken through [`crate::TaskHandle::try_take`].
    #[error("task outcome already taken")]
    Taken,
}

impl From<spotmap_core::Error> for TaskError {
    fn from(err: spotmap_core::Error) -> Self {
        match err {
            spotmap_core::Error::Cancelled => TaskError::Cancelled,
            other => TaskError::ComputationFailure(other.to_string()),
        }
    }
}
