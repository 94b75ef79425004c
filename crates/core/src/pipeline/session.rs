//! Upload session: one in-flight run per user.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use picpost_shared::types::{RunId, UserId};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::PipelineError;
use super::types::{PipelineRun, PipelineState, Stage, StageFailure};
use crate::media::{AcquireOutcome, MediaHandle, MediaMode, MediaSource};
use crate::profile::ProfileService;
use crate::transfer::{TransferService, UploadLocator};
use crate::transform::{ImageTransformer, TransformSpec, TransformedAsset};

/// Stream of states published by a run. Ends after a terminal state.
pub type StateStream = BoxStream<'static, PipelineState>;

/// The four capabilities a run is made of.
#[derive(Clone)]
pub struct PipelineStages {
    /// Where images come from.
    pub media: Arc<dyn MediaSource>,
    /// Resize and re-encode.
    pub transformer: ImageTransformer,
    /// Object storage upload.
    pub transfer: TransferService,
    /// User record update.
    pub profile: ProfileService,
}

impl std::fmt::Debug for PipelineStages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineStages")
            .field("transformer", &self.transformer)
            .field("transfer", &self.transfer)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

/// The session's current run and what it has produced so far.
#[derive(Debug)]
struct RunSlot {
    run: PipelineRun,
    epoch: u64,
    cancel: CancellationToken,
    asset: Option<TransformedAsset>,
    locator: Option<UploadLocator>,
}

type SharedSlot = Arc<Mutex<Option<RunSlot>>>;

fn lock(slot: &SharedSlot) -> MutexGuard<'_, Option<RunSlot>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Coordinates upload runs for a single user.
///
/// Runs are driven by polling the stream returned from
/// [`UploadSession::start_upload`] or [`UploadSession::retry`]; nothing
/// happens between polls. Dropping the stream before it reaches a terminal
/// state abandons the run and frees the session.
#[derive(Debug)]
pub struct UploadSession {
    user_id: UserId,
    stages: PipelineStages,
    default_spec: TransformSpec,
    slot: SharedSlot,
    epochs: Mutex<u64>,
}

impl UploadSession {
    /// Create a session for `user_id`.
    #[must_use]
    pub fn new(user_id: UserId, stages: PipelineStages, default_spec: TransformSpec) -> Self {
        Self {
            user_id,
            stages,
            default_spec,
            slot: Arc::new(Mutex::new(None)),
            epochs: Mutex::new(0),
        }
    }

    /// The user this session belongs to.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    fn next_epoch(&self) -> u64 {
        let mut epochs = self.epochs.lock().unwrap_or_else(PoisonError::into_inner);
        *epochs += 1;
        *epochs
    }

    /// Start a new run.
    ///
    /// A finished run that was never acknowledged is replaced, along with
    /// its retained artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::RunInProgress`] if a run is still in flight;
    /// that run is left untouched.
    pub fn start_upload(
        &self,
        run_id: RunId,
        mode: MediaMode,
        spec: Option<TransformSpec>,
    ) -> Result<StateStream, PipelineError> {
        let spec = spec.unwrap_or(self.default_spec);
        let epoch = self.next_epoch();
        let cancel = CancellationToken::new();

        {
            let mut slot = lock(&self.slot);
            if let Some(active) = slot.as_ref()
                && !active.run.state.is_terminal()
            {
                warn!(
                    run_id = %run_id,
                    active = %active.run.run_id,
                    "Upload rejected, run in progress"
                );
                return Err(PipelineError::RunInProgress {
                    active: active.run.run_id,
                });
            }

            let now = Utc::now();
            *slot = Some(RunSlot {
                run: PipelineRun {
                    run_id,
                    user_id: self.user_id,
                    mode,
                    spec,
                    state: PipelineState::Idle,
                    attempts: 1,
                    started_at: now,
                    updated_at: now,
                },
                epoch,
                cancel: cancel.clone(),
                asset: None,
                locator: None,
            });
        }

        info!(
            run_id = %run_id,
            user_id = %self.user_id,
            mode = %mode,
            width = spec.target_width(),
            format = %spec.output_format(),
            "Upload started"
        );

        Ok(self.drive(run_id, epoch, cancel, spec, Step::Start(mode)))
    }

    /// Cancel the current run.
    ///
    /// The run turns `Cancelled` immediately; a pending acquisition is
    /// interrupted the next time the stream is polled.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::CancelNotAllowed`] once the run has moved
    /// past acquisition and [`PipelineError::NoActiveRun`] if there is no
    /// run.
    pub fn cancel(&self) -> Result<(), PipelineError> {
        let mut slot = lock(&self.slot);
        let current = slot.as_mut().ok_or(PipelineError::NoActiveRun)?;

        if !current.run.state.is_cancellable() {
            return Err(PipelineError::CancelNotAllowed {
                state: current.run.state.clone(),
            });
        }

        current.cancel.cancel();
        current.run.state = PipelineState::Cancelled;
        current.run.updated_at = Utc::now();
        info!(run_id = %current.run.run_id, "Upload cancelled");
        Ok(())
    }

    /// Retry a failed run from the stage that failed.
    ///
    /// Uploading reuses the retained asset and its destination path;
    /// persisting reuses the retained locator.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NothingToRetry`] unless the current run has
    /// failed, and [`PipelineError::NotRetryable`] for acquisition and
    /// transform failures.
    pub fn retry(&self) -> Result<StateStream, PipelineError> {
        let epoch = self.next_epoch();
        let cancel = CancellationToken::new();

        let (run_id, spec, step) = {
            let mut slot = lock(&self.slot);
            let current = slot.as_mut().ok_or(PipelineError::NothingToRetry)?;

            let (stage, retryable) = match &current.run.state {
                PipelineState::Failed { stage, cause } => (*stage, cause.is_retryable()),
                _ => return Err(PipelineError::NothingToRetry),
            };
            if !retryable {
                return Err(PipelineError::NotRetryable { stage });
            }

            let step = match stage {
                Stage::Uploading => current.asset.clone().map(Step::Upload),
                Stage::Persisting => current.locator.clone().map(Step::Persist),
                Stage::Acquiring | Stage::Transforming => None,
            }
            .ok_or(PipelineError::NothingToRetry)?;

            current.run.state = step.entry_state();
            current.run.attempts += 1;
            current.run.updated_at = Utc::now();
            current.epoch = epoch;
            current.cancel = cancel.clone();

            info!(
                run_id = %current.run.run_id,
                stage = %stage,
                attempt = current.run.attempts,
                "Retrying upload"
            );
            (current.run.run_id, current.run.spec, step)
        };

        let entry = step.entry_state();
        Ok(self.drive(run_id, epoch, cancel, spec, Step::Enter(entry, Box::new(step))))
    }

    /// Snapshot of the current run, if any.
    #[must_use]
    pub fn current_run(&self) -> Option<PipelineRun> {
        lock(&self.slot).as_ref().map(|slot| slot.run.clone())
    }

    /// Transformed asset kept by the current run for an upload retry.
    #[must_use]
    pub fn retained_asset(&self) -> Option<TransformedAsset> {
        lock(&self.slot).as_ref().and_then(|slot| slot.asset.clone())
    }

    /// Locator kept by the current run for a persistence retry.
    #[must_use]
    pub fn retained_locator(&self) -> Option<UploadLocator> {
        lock(&self.slot).as_ref().and_then(|slot| slot.locator.clone())
    }

    /// Discard a finished run and its retained artifacts.
    ///
    /// Acknowledging an empty session is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::RunInProgress`] if the run is still in
    /// flight.
    pub fn acknowledge(&self) -> Result<(), PipelineError> {
        let mut slot = lock(&self.slot);
        if let Some(current) = slot.as_ref() {
            if !current.run.state.is_terminal() {
                return Err(PipelineError::RunInProgress {
                    active: current.run.run_id,
                });
            }
            debug!(run_id = %current.run.run_id, state = %current.run.state, "Run acknowledged");
        }
        *slot = None;
        Ok(())
    }

    fn drive(
        &self,
        run_id: RunId,
        epoch: u64,
        cancel: CancellationToken,
        spec: TransformSpec,
        first: Step,
    ) -> StateStream {
        let driver = RunDriver {
            run_id,
            user_id: self.user_id,
            spec,
            stages: self.stages.clone(),
            cancel,
            slot: RunGuard {
                slot: Arc::clone(&self.slot),
                epoch,
                run_id,
            },
            next: Some(first),
        };

        stream::unfold(driver, |mut driver| async move {
            let step = driver.next.take()?;
            let (state, next) = driver.advance(step).await;
            driver.next = if state.is_terminal() { None } else { next };
            Some((state, driver))
        })
        .boxed()
    }
}

/// Work left in a run.
#[derive(Debug)]
enum Step {
    /// Leave `Idle`.
    Start(MediaMode),
    Acquire(MediaMode),
    Transform(MediaHandle),
    Upload(TransformedAsset),
    Persist(UploadLocator),
    /// Publish a state that was already recorded, then continue.
    Enter(PipelineState, Box<Step>),
}

impl Step {
    fn entry_state(&self) -> PipelineState {
        match self {
            Self::Start(_) => PipelineState::Idle,
            Self::Acquire(_) => PipelineState::Acquiring,
            Self::Transform(_) => PipelineState::Transforming,
            Self::Upload(_) => PipelineState::Uploading,
            Self::Persist(_) => PipelineState::Persisting,
            Self::Enter(state, _) => state.clone(),
        }
    }
}

/// Owns the run's slot on behalf of one stream.
///
/// Dropping it before the run is terminal clears the slot.
struct RunGuard {
    slot: SharedSlot,
    epoch: u64,
    run_id: RunId,
}

impl RunGuard {
    /// Record `next` unless the run was cancelled or replaced meanwhile,
    /// in which case the state that stands is returned instead.
    fn transition(&self, next: PipelineState, retain: impl FnOnce(&mut RunSlot)) -> PipelineState {
        let mut slot = lock(&self.slot);
        match slot.as_mut() {
            Some(current) if current.epoch == self.epoch => {
                if current.run.state.is_terminal() {
                    return current.run.state.clone();
                }
                retain(current);
                current.run.state = next.clone();
                current.run.updated_at = Utc::now();
                next
            }
            _ => PipelineState::Cancelled,
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut slot = lock(&self.slot);
        let abandoned = slot
            .as_ref()
            .is_some_and(|current| current.epoch == self.epoch && !current.run.state.is_terminal());
        if abandoned {
            debug!(run_id = %self.run_id, "Run abandoned before completion");
            *slot = None;
        }
    }
}

struct RunDriver {
    run_id: RunId,
    user_id: UserId,
    spec: TransformSpec,
    stages: PipelineStages,
    cancel: CancellationToken,
    slot: RunGuard,
    next: Option<Step>,
}

impl RunDriver {
    /// Run one step; returns the state to publish and the step after it.
    async fn advance(&mut self, step: Step) -> (PipelineState, Option<Step>) {
        match step {
            Step::Enter(state, then) => (state, Some(*then)),

            Step::Start(mode) => {
                if self.cancel.is_cancelled() {
                    return (PipelineState::Cancelled, None);
                }
                self.enter(PipelineState::Acquiring, Step::Acquire(mode), |_| {})
            }

            Step::Acquire(mode) => {
                let outcome = tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => AcquireOutcome::Cancelled,
                    outcome = self.stages.media.acquire(mode) => outcome,
                };

                match outcome {
                    AcquireOutcome::Acquired(handle) => {
                        debug!(run_id = %self.run_id, "Media acquired");
                        self.enter(PipelineState::Transforming, Step::Transform(handle), |_| {})
                    }
                    AcquireOutcome::Cancelled => {
                        info!(run_id = %self.run_id, "Acquisition cancelled");
                        (self.slot.transition(PipelineState::Cancelled, |_| {}), None)
                    }
                    AcquireOutcome::PermissionDenied => {
                        warn!(run_id = %self.run_id, "Media permission denied");
                        (
                            self.slot.transition(PipelineState::PermissionDenied, |_| {}),
                            None,
                        )
                    }
                    AcquireOutcome::Unavailable { reason } => {
                        self.fail(StageFailure::AcquisitionFailed { reason })
                    }
                }
            }

            Step::Transform(handle) => {
                match self.stages.transformer.transform(&handle, &self.spec).await {
                    Ok(asset) => {
                        let retained = asset.clone();
                        self.enter(PipelineState::Uploading, Step::Upload(asset), move |slot| {
                            slot.asset = Some(retained);
                        })
                    }
                    Err(e) => self.fail(StageFailure::TransformFailed {
                        reason: e.to_string(),
                    }),
                }
            }

            Step::Upload(asset) => {
                let path = TransferService::destination_path(self.user_id, &asset);
                match self.stages.transfer.transfer(&asset, &path).await {
                    Ok(locator) => {
                        let retained = locator.clone();
                        self.enter(PipelineState::Persisting, Step::Persist(locator), move |slot| {
                            slot.locator = Some(retained);
                        })
                    }
                    Err(e) => self.fail(StageFailure::TransferFailed {
                        cause: e.to_string(),
                    }),
                }
            }

            Step::Persist(locator) => {
                match self.stages.profile.persist(self.user_id, &locator).await {
                    Ok(ack) => {
                        let state = self
                            .slot
                            .transition(PipelineState::Succeeded { url: ack.url }, |_| {});
                        info!(run_id = %self.run_id, path = %locator.path, "Upload succeeded");
                        (state, None)
                    }
                    Err(e) => self.fail(StageFailure::PersistenceFailed {
                        cause: e.to_string(),
                    }),
                }
            }
        }
    }

    fn enter(
        &self,
        state: PipelineState,
        next: Step,
        retain: impl FnOnce(&mut RunSlot),
    ) -> (PipelineState, Option<Step>) {
        let published = self.slot.transition(state, retain);
        if published.is_terminal() {
            debug!(run_id = %self.run_id, state = %published, "Run ended underneath the driver");
            return (published, None);
        }
        debug!(run_id = %self.run_id, stage = %published, "Stage entered");
        (published, Some(next))
    }

    fn fail(&self, cause: StageFailure) -> (PipelineState, Option<Step>) {
        warn!(
            run_id = %self.run_id,
            stage = %cause.stage(),
            retryable = cause.is_retryable(),
            error = %cause,
            "Stage failed"
        );
        (self.slot.transition(PipelineState::failed(cause), |_| {}), None)
    }
}
