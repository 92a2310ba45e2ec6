// Consistent exit codes for the pagedraft CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/argument error
//   12 = version conflict
//   13 = network error
//   14 = patch rejected by the validator

use std::fmt;
use std::process;

use pagedraft_common::patch::ValidationReport;
use pagedraft_editor::StoreError;

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    Conflict = 12,
    Network = 13,
    InvalidPatch = 14,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if cause.downcast_ref::<PatchRejected>().is_some() {
                return Self::InvalidPatch;
            }
            if let Some(store_err) = cause.downcast_ref::<StoreError>() {
                return Self::from_store_error(store_err);
            }
            if cause.downcast_ref::<serde_json::Error>().is_some() {
                return Self::Usage;
            }
        }
        Self::Error
    }

    pub fn from_store_error(err: &StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => Self::Conflict,
            err if err.is_transient() => Self::Network,
            StoreError::Http { status: 400, .. } => Self::Usage,
            _ => Self::Error,
        }
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}

/// A patch the validator refused, embedded in an `anyhow::Error` chain.
#[derive(Debug)]
pub struct PatchRejected {
    pub report: ValidationReport,
}

impl fmt::Display for PatchRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "patch rejected: {}", self.report)
    }
}

impl std::error::Error for PatchRejected {}
