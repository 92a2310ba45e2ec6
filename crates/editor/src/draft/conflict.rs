use chrono::{DateTime, Utc};

use pagedraft_common::diff::diff;
use pagedraft_common::types::{Document, PatchOp};

/// Both sides of a rejected save, held until the user confirms or cancels.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictRecord {
    /// Last document this editor saved successfully.
    pub old: Document,
    /// Latest server draft.
    pub new: Document,
    /// Local working copy when the conflict was detected.
    pub local: Document,
    pub local_version: u64,
    pub current_version: u64,
    pub detected_at: DateTime<Utc>,
}

impl ConflictRecord {
    /// Edits another editor saved since our last successful save.
    pub fn changes(&self) -> Vec<PatchOp> {
        diff(&self.old, &self.new)
    }

    /// Local edits made since the last successful save.
    pub fn local_changes(&self) -> Vec<PatchOp> {
        diff(&self.old, &self.local)
    }

    /// Ops that turn the local working copy into the server draft.
    pub fn discarded_by_confirm(&self) -> Vec<PatchOp> {
        diff(&self.local, &self.new)
    }
}
