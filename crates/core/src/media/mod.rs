//! Media acquisition: the capability that hands the pipeline a local image.
//!
//! Capture and selection UI belong to the host platform. The pipeline only
//! sees the [`MediaSource`] trait and its three outcomes.

mod source;
mod types;

pub use source::{FileMediaSource, MediaSource, MemoryMediaSource};
pub use types::{AcquireOutcome, MediaData, MediaHandle, MediaMode};
