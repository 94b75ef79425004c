//! Pipeline state machine types.
//!
//! A run moves strictly forward:
//! - Idle → Acquiring → Transforming → Uploading → Persisting → Succeeded
//! - Idle | Acquiring → Cancelled | PermissionDenied
//! - Acquiring | Transforming | Uploading | Persisting → Failed
//!
//! A retry re-enters the failed stage (Uploading or Persisting) with the
//! artifact retained from the earlier attempt.

use std::fmt;

use chrono::{DateTime, Utc};
use picpost_shared::types::{RunId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::media::MediaMode;
use crate::transform::TransformSpec;

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Selecting or capturing the image.
    Acquiring,
    /// Resizing and re-encoding.
    Transforming,
    /// Writing to object storage.
    Uploading,
    /// Recording the URL on the user's document.
    Persisting,
}

impl Stage {
    /// Returns the string representation of the stage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Acquiring => "acquiring",
            Self::Transforming => "transforming",
            Self::Uploading => "uploading",
            Self::Persisting => "persisting",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a stage failed, flattened from the stage's own error type.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageFailure {
    /// The picked image could not be opened.
    #[error("acquisition failed: {reason}")]
    AcquisitionFailed {
        /// Underlying error message.
        reason: String,
    },
    /// The image could not be decoded, resized or encoded.
    #[error("transform failed: {reason}")]
    TransformFailed {
        /// Underlying error message.
        reason: String,
    },
    /// The object could not be written or confirmed.
    #[error("transfer failed: {cause}")]
    TransferFailed {
        /// Underlying error message.
        cause: String,
    },
    /// The user's record could not be updated.
    #[error("persistence failed: {cause}")]
    PersistenceFailed {
        /// Underlying error message.
        cause: String,
    },
}

impl StageFailure {
    /// Transfer and persistence failures can be retried. Nothing remote
    /// has happened before a transform, so earlier failures start over.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransferFailed { .. } | Self::PersistenceFailed { .. }
        )
    }

    /// The stage this failure belongs to.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::AcquisitionFailed { .. } => Stage::Acquiring,
            Self::TransformFailed { .. } => Stage::Transforming,
            Self::TransferFailed { .. } => Stage::Uploading,
            Self::PersistenceFailed { .. } => Stage::Persisting,
        }
    }
}

/// Observable state of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    /// Created, not yet polled.
    Idle,
    /// Waiting for the media source.
    Acquiring,
    /// Transforming the acquired image.
    Transforming,
    /// Uploading the transformed asset.
    Uploading,
    /// Writing the locator to the user's record.
    Persisting,
    /// The record now points at `url`.
    Succeeded {
        /// Stored image URL.
        url: String,
    },
    /// The user cancelled before anything left the device.
    Cancelled,
    /// The media source was refused access.
    PermissionDenied,
    /// A stage failed.
    Failed {
        /// Stage that failed.
        stage: Stage,
        /// What went wrong.
        cause: StageFailure,
    },
}

impl PipelineState {
    /// Build the failed state for `cause`.
    #[must_use]
    pub fn failed(cause: StageFailure) -> Self {
        Self::Failed {
            stage: cause.stage(),
            cause,
        }
    }

    /// Returns the string representation of the state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Acquiring => "acquiring",
            Self::Transforming => "transforming",
            Self::Uploading => "uploading",
            Self::Persisting => "persisting",
            Self::Succeeded { .. } => "succeeded",
            Self::Cancelled => "cancelled",
            Self::PermissionDenied => "permission_denied",
            Self::Failed { .. } => "failed",
        }
    }

    /// Returns true once the run can make no further progress on its own.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded { .. } | Self::Cancelled | Self::PermissionDenied | Self::Failed { .. }
        )
    }

    /// Returns true while cancellation is still allowed.
    #[must_use]
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Idle | Self::Acquiring)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { stage, cause } => write!(f, "failed at {stage}: {cause}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Snapshot of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    /// Caller-chosen run identifier.
    pub run_id: RunId,
    /// Whose image is being uploaded.
    pub user_id: UserId,
    /// Gallery or camera.
    pub mode: MediaMode,
    /// Transform parameters for this run.
    pub spec: TransformSpec,
    /// Current state.
    pub state: PipelineState,
    /// Number of times the run was started or retried.
    pub attempts: u32,
    /// When the run was started.
    pub started_at: DateTime<Utc>,
    /// When the state last changed.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(PipelineState::Idle, false, true)]
    #[case(PipelineState::Acquiring, false, true)]
    #[case(PipelineState::Transforming, false, false)]
    #[case(PipelineState::Uploading, false, false)]
    #[case(PipelineState::Persisting, false, false)]
    #[case(PipelineState::Succeeded { url: "u".into() }, true, false)]
    #[case(PipelineState::Cancelled, true, false)]
    #[case(PipelineState::PermissionDenied, true, false)]
    #[case(
        PipelineState::failed(StageFailure::TransferFailed { cause: "x".into() }),
        true,
        false
    )]
    fn test_state_flags(
        #[case] state: PipelineState,
        #[case] terminal: bool,
        #[case] cancellable: bool,
    ) {
        assert_eq!(state.is_terminal(), terminal);
        assert_eq!(state.is_cancellable(), cancellable);
    }

    #[rstest]
    #[case(StageFailure::AcquisitionFailed { reason: "r".into() }, Stage::Acquiring, false)]
    #[case(StageFailure::TransformFailed { reason: "r".into() }, Stage::Transforming, false)]
    #[case(StageFailure::TransferFailed { cause: "c".into() }, Stage::Uploading, true)]
    #[case(StageFailure::PersistenceFailed { cause: "c".into() }, Stage::Persisting, true)]
    fn test_failure_stage_and_retryability(
        #[case] failure: StageFailure,
        #[case] stage: Stage,
        #[case] retryable: bool,
    ) {
        assert_eq!(failure.stage(), stage);
        assert_eq!(failure.is_retryable(), retryable);
        assert_eq!(PipelineState::failed(failure).as_str(), "failed");
    }

    #[test]
    fn test_failed_display_names_stage() {
        let state = PipelineState::failed(StageFailure::PersistenceFailed {
            cause: "document not found".into(),
        });
        assert_eq!(
            state.to_string(),
            "failed at persisting: persistence failed: document not found"
        );
    }
}
