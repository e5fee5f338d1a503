//! Fatal run errors and their process exit codes.
//!
//! Recoverable problems (a single case failing to fetch, a digest that could
//! not be delivered) are recorded in the run summary instead.
use std::process::ExitCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    /// Settings are missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The case list could not be read; nothing was fetched.
    #[error("case list unavailable: {0:#}")]
    SourceUnavailable(anyhow::Error),

    /// The refreshed state could not be written; the next run will
    /// re-detect the same changes.
    #[error("failed to persist case state: {0:#}")]
    SinkWriteFailure(anyhow::Error),

    /// Another run holds the run lock.
    #[error("another run is in progress: {0}")]
    Locked(String),
}

impl RunError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            RunError::Config(_) => ExitCode::from(1),
            RunError::SourceUnavailable(_) => ExitCode::from(2),
            RunError::SinkWriteFailure(_) => ExitCode::from(3),
            RunError::Locked(_) => ExitCode::from(4),
        }
    }
}

impl From<crate::config::ConfigError> for RunError {
    fn from(err: crate::config::ConfigError) -> Self {
        RunError::Config(err.to_string())
    }
}
