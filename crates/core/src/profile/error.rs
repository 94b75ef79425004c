//! Persistence error types.

use thiserror::Error;

/// Errors reported by a document store backend.
#[derive(Debug, Error)]
pub enum DocumentStoreError {
    /// No document exists for the user.
    #[error("document not found for user {user_id}")]
    NotFound {
        /// The user whose document is missing.
        user_id: String,
    },

    /// The backend refused the write.
    #[error("document store permission denied: {0}")]
    PermissionDenied(String),

    /// A concurrent write won.
    #[error("document write conflict: {0}")]
    Conflict(String),

    /// Connection, query or driver failure.
    #[error("document store error: {0}")]
    Backend(String),
}

impl DocumentStoreError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(user_id: impl ToString) -> Self {
        Self::NotFound {
            user_id: user_id.to_string(),
        }
    }

    /// Create a backend error.
    #[must_use]
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Errors from the persistence stage. All of them are retryable.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The store rejected or failed the write.
    #[error(transparent)]
    Store(#[from] DocumentStoreError),

    /// The write did not complete in time.
    #[error("record write timed out after {secs}s")]
    Timeout {
        /// Configured timeout.
        secs: u64,
    },
}
