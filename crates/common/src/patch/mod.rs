// Patch operations: apply, sanitize, validate.
//
// Untrusted candidate patches go sanitize → validate → apply. Validation
// rejects a patch as a whole; application is tolerant per operation.

pub mod apply;
pub mod sanitize;
pub mod validate;

pub use apply::{apply_op, apply_patch, apply_patch_with_report, PatchError, PatchOutcome, SkippedOp};
pub use sanitize::sanitize;
pub use validate::{validate, IssueKind, PatchPolicy, ValidationIssue, ValidationReport};
