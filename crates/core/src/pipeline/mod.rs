//! Pipeline coordinator.
//!
//! Sequences acquisition, transform, transfer and persistence for one
//! image, publishes each state transition on a stream and keeps the
//! artifacts a retry needs.

mod error;
mod registry;
mod session;
mod types;


pub use error::PipelineError;
pub use registry::SessionRegistry;
pub use session::{PipelineStages, StateStream, UploadSession};
pub use types::{PipelineRun, PipelineState, Stage, StageFailure};
