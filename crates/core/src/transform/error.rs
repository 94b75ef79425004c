//! Transform error types.

use thiserror::Error;

/// Transform stage errors.
///
/// Every variant except `InvalidSpec` means the input itself is defective
/// or could not be processed; none of them are retried.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Transform parameters out of range.
    #[error("invalid transform spec: {0}")]
    InvalidSpec(String),

    /// The handle points at zero bytes.
    #[error("source image is empty")]
    EmptyInput,

    /// The source could not be read.
    #[error("source image unreadable: {0}")]
    Unreadable(String),

    /// The bytes are not a decodable image.
    #[error("source image could not be decoded: {0}")]
    Decode(String),

    /// The encoder rejected the image.
    #[error("image could not be encoded: {0}")]
    Encode(String),

    /// The encoder produced no bytes.
    #[error("encoder produced an empty image")]
    EmptyOutput,

    /// CPU budget exhausted.
    #[error("transform exceeded its {budget_secs}s budget")]
    Timeout {
        /// Budget in seconds.
        budget_secs: u64,
    },

    /// The blocking worker panicked or was cancelled.
    #[error("transform worker failed: {0}")]
    Worker(String),
}

impl TransformError {
    /// Create an invalid spec error.
    #[must_use]
    pub fn invalid_spec(msg: impl Into<String>) -> Self {
        Self::InvalidSpec(msg.into())
    }

    /// Create a decode error.
    #[must_use]
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an encode error.
    #[must_use]
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}
