//! Cooperative cancellation
//!
//! Loading and searching are the two operations that can run long on large
//! corpora. Both poll a [`CancelToken`] at their iteration boundaries and
//! abort with [`Cancelled`] once it fires; any partial result is discarded
//! by the caller simply dropping it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Error returned when an operation observes a fired [`CancelToken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// A cloneable cancellation signal.
///
/// Clones share the underlying flag, so a token handed to a long-running
/// search can be fired from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    fired: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that has not fired.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the token. Idempotent.
    pub fn cancel(&self) {
        self.fired.store(true, Ordering::Relaxed);
    }

    /// Whether the token has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.fired.load(Ordering::Relaxed)
    }

    /// Poll the token, converting a fired signal into an error.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
