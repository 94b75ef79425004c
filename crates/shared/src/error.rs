//! Application-wide error types.

use thiserror::Error;

/// Application error types.
///
/// Stage failures inside a pipeline run never surface here: they are part of
/// the run's terminal state. These are the errors that stop a binary from
/// wiring or driving the pipeline at all.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input rejected before any work started.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Object storage could not be initialised.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// The coordinator refused the request (e.g. a run is already in flight).
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

impl AppError {
    /// Returns the process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 78,
            Self::Validation(_) => 64,
            Self::Storage(_) | Self::Database(_) => 69,
            Self::Pipeline(_) => 75,
        }
    }

    /// Returns a stable error code for logs and machine consumers.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Pipeline(_) => "PIPELINE_ERROR",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
