//! Coordinator error types.

use picpost_shared::types::RunId;
use thiserror::Error;

use super::types::{PipelineState, Stage};

/// Requests the coordinator refuses. Stage failures are not errors here;
/// they arrive as [`PipelineState::Failed`] on the state stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Another run is still in flight for this session.
    #[error("run {active} is still in progress")]
    RunInProgress {
        /// The run that keeps going.
        active: RunId,
    },

    /// Cancellation is only possible before the transform starts.
    #[error("cannot cancel a run that is {state}")]
    CancelNotAllowed {
        /// State the run was in.
        state: PipelineState,
    },

    /// The session has no run.
    #[error("no active run")]
    NoActiveRun,

    /// There is no failed run to retry.
    #[error("no failed run to retry")]
    NothingToRetry,

    /// The failed stage cannot be retried.
    #[error("{stage} failures cannot be retried")]
    NotRetryable {
        /// The failed stage.
        stage: Stage,
    },
}
