//! Media handle types.

use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Where the image comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaMode {
    /// Picked from the device's photo library.
    Gallery,
    /// Captured with the camera.
    Camera,
}

impl MediaMode {
    /// Returns the string representation of the mode.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gallery => "gallery",
            Self::Camera => "camera",
        }
    }

    /// Parses a mode from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gallery" => Some(Self::Gallery),
            "camera" => Some(Self::Camera),
            _ => None,
        }
    }
}

impl fmt::Display for MediaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The image payload behind a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaData {
    /// A file on the local filesystem, read lazily by the transform stage.
    Path(PathBuf),
    /// Bytes already in memory.
    Bytes(Bytes),
}

/// Opaque reference to a local image plus the mode it was acquired with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle {
    data: MediaData,
    source: MediaMode,
}

impl MediaHandle {
    /// Handle to a file on disk.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>, source: MediaMode) -> Self {
        Self {
            data: MediaData::Path(path.into()),
            source,
        }
    }

    /// Handle to an in-memory buffer.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Bytes>, source: MediaMode) -> Self {
        Self {
            data: MediaData::Bytes(bytes.into()),
            source,
        }
    }

    /// The payload.
    #[must_use]
    pub fn data(&self) -> &MediaData {
        &self.data
    }

    /// Gallery or camera.
    #[must_use]
    pub fn source(&self) -> MediaMode {
        self.source
    }
}

/// Result of asking the host for an image.
///
/// Neither `Cancelled` nor `PermissionDenied` is an error: both are normal
/// outcomes the caller renders directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image was produced.
    Acquired(MediaHandle),
    /// The user backed out, or the host reported success without data.
    Cancelled,
    /// The host refused access to the camera or library.
    PermissionDenied,
    /// The picked image exists but could not be opened.
    Unavailable {
        /// Underlying error message.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_mode_roundtrip() {
        for mode in [MediaMode::Gallery, MediaMode::Camera] {
            assert_eq!(MediaMode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(MediaMode::parse("CAMERA"), Some(MediaMode::Camera));
        assert_eq!(MediaMode::parse("scanner"), None);
    }

    #[test]
    fn test_handle_keeps_source_tag() {
        let handle = MediaHandle::from_bytes(vec![1u8, 2, 3], MediaMode::Camera);
        assert_eq!(handle.source(), MediaMode::Camera);
        assert_eq!(
            handle.data(),
            &MediaData::Bytes(Bytes::from_static(&[1, 2, 3]))
        );
    }
}
