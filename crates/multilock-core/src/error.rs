//! Error types for lock operations.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during lock operations.
///
/// Contention is not an error: non-blocking attempts report a held lock as
/// `Ok(None)`, and a full slot family likewise. Everything here is either a
/// violated wait bound or a genuine failure.
#[derive(Error, Debug)]
pub enum LockError {
    /// Lock acquisition timed out.
    #[error("lock acquisition timed out after {0:?}")]
    Timeout(Duration),

    /// An open, lock, or stat call failed for a reason other than contention.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid lock name.
    #[error("invalid lock name: {0}")]
    InvalidName(String),

    /// A slot that was free moments ago refused to lock.
    ///
    /// Raised by the slot-pool allocator when a candidate file that did not
    /// exist during the scan turns out to be held. Indicates an environment
    /// or programming defect, not contention; never retried.
    #[error("slot inconsistency: {0}")]
    SlotInconsistency(String),
}

impl LockError {
    /// Wraps an OS error with call-site context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;
