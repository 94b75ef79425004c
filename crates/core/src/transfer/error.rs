//! Transfer error types.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors from the transfer stage. All of them are retryable.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The object store rejected or failed an operation.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The write returned but the stored object does not match the payload.
    #[error("object not durable: expected {expected} bytes, store reports {actual}")]
    NotDurable {
        /// Payload size.
        expected: u64,
        /// Size reported by the store.
        actual: u64,
    },

    /// The transfer did not complete in time.
    #[error("transfer timed out after {secs}s")]
    Timeout {
        /// Configured timeout.
        secs: u64,
    },
}
