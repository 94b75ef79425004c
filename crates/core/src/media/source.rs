//! Media source capability and the two host-independent implementations.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use super::types::{AcquireOutcome, MediaHandle, MediaMode};

/// Select or capture an image.
///
/// Callers are expected to have obtained device permissions already; a
/// refusal still comes back as [`AcquireOutcome::PermissionDenied`] rather
/// than as an error. Implementations must not touch storage or network.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Produce an image for `mode`, or report why none is available.
    async fn acquire(&self, mode: MediaMode) -> AcquireOutcome;
}

/// A file the host's picker (or a command line) already chose.
#[derive(Debug, Clone)]
pub struct FileMediaSource {
    path: PathBuf,
}

impl FileMediaSource {
    /// Creates a source that yields `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MediaSource for FileMediaSource {
    async fn acquire(&self, mode: MediaMode) -> AcquireOutcome {
        let file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                debug!(path = %self.path.display(), "Media access denied");
                return AcquireOutcome::PermissionDenied;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No media at path");
                return AcquireOutcome::Cancelled;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cannot open picked file");
                return AcquireOutcome::Unavailable {
                    reason: format!("{}: {e}", self.path.display()),
                };
            }
        };

        match file.metadata().await {
            Ok(meta) if meta.is_file() => {
                AcquireOutcome::Acquired(MediaHandle::from_path(self.path.clone(), mode))
            }
            Ok(_) => {
                warn!(path = %self.path.display(), "Picked path is not a regular file");
                AcquireOutcome::Cancelled
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cannot stat picked file");
                AcquireOutcome::Unavailable {
                    reason: format!("{}: {e}", self.path.display()),
                }
            }
        }
    }
}

/// A buffer handed over by the host, e.g. a camera frame.
///
/// `None` models a picker that reported success without any data.
#[derive(Debug, Clone, Default)]
pub struct MemoryMediaSource {
    bytes: Option<Bytes>,
    permission_denied: bool,
}

impl MemoryMediaSource {
    /// Creates a source that yields `bytes` (or nothing).
    #[must_use]
    pub fn new(bytes: Option<Bytes>) -> Self {
        Self {
            bytes,
            permission_denied: false,
        }
    }

    /// Creates a source whose host refuses access.
    #[must_use]
    pub fn denied() -> Self {
        Self {
            bytes: None,
            permission_denied: true,
        }
    }
}

#[async_trait]
impl MediaSource for MemoryMediaSource {
    async fn acquire(&self, mode: MediaMode) -> AcquireOutcome {
        if self.permission_denied {
            return AcquireOutcome::PermissionDenied;
        }
        match &self.bytes {
            Some(bytes) => AcquireOutcome::Acquired(MediaHandle::from_bytes(bytes.clone(), mode)),
            None => AcquireOutcome::Cancelled,
        }
    }
}
