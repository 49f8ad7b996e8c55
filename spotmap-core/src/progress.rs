//! Progress reporting and cooperative cancellation hooks for long computations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Shared cancellation flag.
///
/// Clones observe the same flag. Computations poll it at chunk boundaries
/// and stop with [`Error::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates an unset token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Sink for coarse progress messages emitted by long computations.
pub trait Progress {
    /// Reports a human-readable status line.
    fn report(&self, message: String);

    /// Returns true if the computation should stop.
    fn is_cancelled(&self) -> bool;

    /// Returns `Err(Error::Cancelled)` once cancellation was requested.
    fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Progress sink that drops messages and is never cancelled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&self, _message: String) {}

    fn is_cancelled(&self) -> bool {
        false
    }
}

impl Progress for CancelToken {
    fn report(&self, _message: String) {}

    fn is_cancelled(&self) -> bool {
        CancelToken::is_cancelled(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(Progress::checkpoint(&token).is_ok());
        clone.cancel();
        assert!(token.is_cancelled());
        assert_eq!(Progress::checkpoint(&token), Err(Error::Cancelled));
    }

    #[test]
    fn test_no_progress() {
        assert!(NoProgress.checkpoint().is_ok());
    }
}
