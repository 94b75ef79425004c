//! Transform output.

use bytes::Bytes;

/// An encoded image ready for upload.
///
/// Owned by a single pipeline run. `Bytes` makes retries cheap: a failed
/// transfer re-sends the same buffer without copying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedAsset {
    /// Encoded payload.
    pub bytes: Bytes,
    /// MIME type of `bytes`.
    pub content_type: &'static str,
    /// Filename derived from the payload checksum.
    pub filename: String,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Lowercase hex SHA-256 of `bytes`.
    pub checksum_sha256: String,
}

impl TransformedAsset {
    /// Payload size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}
