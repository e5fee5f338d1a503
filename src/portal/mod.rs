//! Clients for the Rama Judicial portal.
//!
//! `api` talks to the JSON consultation API used for case status; `legacy`
//! scrapes the older ASP.NET form that still lists judicial entities.
mod api;
pub mod legacy;

use crate::model::FetchResult;
use thiserror::Error;

pub use api::RamaApi;

/// Per-case fetch failures; all are recovered by skipping the case.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("portal request timed out: {0}")]
    Timeout(String),

    #[error("portal request failed: {0}")]
    Transport(String),

    #[error("unexpected portal response: {0}")]
    Malformed(String),

    /// The run deadline passed before this case was fetched.
    #[error("run deadline exceeded before fetch")]
    DeadlineExceeded,
}

impl From<ureq::Error> for FetchError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Timeout(_) => FetchError::Timeout(err.to_string()),
            ureq::Error::Json(_) => FetchError::Malformed(err.to_string()),
            other => FetchError::Transport(other.to_string()),
        }
    }
}

/// Current-state lookup for one case.
pub trait PortalClient: Send + Sync {
    fn fetch(&self, case_id: &str) -> Result<FetchResult, FetchError>;
}
