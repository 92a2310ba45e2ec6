// Error taxonomy for the editing session.

use std::time::Duration;

use thiserror::Error;

use pagedraft_common::patch::ValidationReport;

/// Failure talking to the page-record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("store returned {status}: {message}")]
    Http { status: u16, message: String, retry_after: Option<Duration> },
    #[error("version conflict: the page is at version {current_version}")]
    Conflict { current_version: u64 },
    #[error("page not found")]
    NotFound,
    #[error("could not decode store response: {0}")]
    Decode(String),
}

/// Status the service uses while it cannot yet evaluate version preconditions.
pub const STATUS_PRECONDITION_TRANSIENT: u16 = 412;
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

impl StoreError {
    /// Whether retrying the same request may succeed.
    ///
    /// Transport failures, timeouts, 5xx, rate limiting and the cold-restart
    /// precondition status are transient. Everything else is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Http { status, .. } => {
                *status >= 500 || *status == STATUS_TOO_MANY_REQUESTS || *status == STATUS_PRECONDITION_TRANSIENT
            }
            Self::Conflict { .. } | Self::NotFound | Self::Decode(_) => false,
        }
    }

    /// Server-requested delay before the next attempt, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http { status, message: message.into(), retry_after: None }
    }
}

/// Failure of a draft-controller operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DraftError {
    #[error("the draft has not been loaded yet")]
    Loading,
    #[error("patch rejected: {0}")]
    Validation(ValidationReport),
    #[error("version conflict: local version {local_version}, server is at {current_version}")]
    Conflict { local_version: u64, current_version: u64 },
    #[error("a conflict is waiting for confirmation")]
    ConflictPending,
    #[error("the page was deleted on the server")]
    Deleted,
    #[error("store unavailable after retries: {0}")]
    Transient(StoreError),
    #[error("store request failed: {0}")]
    Terminal(StoreError),
    #[error("store is not ready: {0}")]
    NotReady(StoreError),
    #[error("the page has never been published")]
    NothingPublished,
}

impl DraftError {
    /// Classify a store failure that is not a version conflict.
    pub fn from_store(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => Self::Deleted,
            error if error.is_transient() => Self::Transient(error),
            error => Self::Terminal(error),
        }
    }
}
