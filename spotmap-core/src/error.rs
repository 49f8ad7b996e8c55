//! Error types for spotmap-core.

use thiserror::Error;

/// Result type alias for spotmap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for spotmap computations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed input geometry (e.g. a position buffer that is not made of triples).
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Grid dimensions or world sizes that cannot describe a volume.
    #[error("invalid grid: {0}")]
    InvalidGrid(String),

    /// A spot that cannot be used (non-positive radius, non-finite position).
    #[error("invalid spot {name:?}: {reason}")]
    InvalidSpot { name: String, reason: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The computation observed its cancellation token and stopped early.
    #[error("computation cancelled")]
    Cancelled,
}

impl Error {
    /// Returns true if this error is the cooperative cancellation outcome.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
