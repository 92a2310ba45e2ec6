// Server-side write semantics for page records.
//
// Shared by the relay and the in-memory store so both enforce the same
// version precondition and apply rules.

use thiserror::Error;
use tracing::debug;

use crate::patch::apply_patch_with_report;
use crate::pointer::Pointer;
use crate::protocol::pages::{DraftState, PageMetaUpdate, PageRecord, PublishedState, WriteMode, WriteRequest};
use crate::types::{Document, OpKind};

/// Version assigned to a freshly created draft.
pub const INITIAL_VERSION: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteRejection {
    #[error("version conflict: write based on {base_version}, current is {current_version}")]
    Conflict { base_version: u64, current_version: u64 },
    #[error("`schema` is required when mode is `schema`")]
    MissingSchema,
    #[error("`patches` is required when mode is `patches`")]
    MissingPatches,
    #[error("operation {index} is invalid: {reason}")]
    InvalidOp { index: usize, reason: String },
    #[error("page has never been published")]
    NotPublished,
}

/// Check the precondition and compute the next draft state.
///
/// Patch writes reject unknown operation kinds and malformed pointers up
/// front; operations that are merely inapplicable to the stored draft are
/// skipped by the tolerant applier.
pub fn apply_write(draft: &DraftState, request: &WriteRequest) -> Result<DraftState, WriteRejection> {
    if request.base_version != draft.version {
        return Err(WriteRejection::Conflict {
            base_version: request.base_version,
            current_version: draft.version,
        });
    }

    let schema = match request.mode {
        WriteMode::Schema => request.schema.clone().ok_or(WriteRejection::MissingSchema)?,
        WriteMode::Patches => {
            let patches = request.patches.as_deref().ok_or(WriteRejection::MissingPatches)?;
            for (index, op) in patches.iter().enumerate() {
                if let OpKind::Unknown(raw) = &op.op {
                    return Err(WriteRejection::InvalidOp { index, reason: format!("unknown operation `{raw}`") });
                }
                if op.op.requires_value() && op.value.is_none() {
                    return Err(WriteRejection::InvalidOp { index, reason: format!("`{}` requires a value", op.op) });
                }
                Pointer::parse(&op.path)
                    .map_err(|err| WriteRejection::InvalidOp { index, reason: err.to_string() })?;
            }
            let outcome = apply_patch_with_report(&draft.schema, patches);
            if !outcome.fully_applied() {
                debug!(skipped = outcome.skipped.len(), "write applied with skipped operations");
            }
            outcome.document
        }
    };

    Ok(DraftState { schema, version: draft.version + 1 })
}

impl PageRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>, slug: impl Into<String>, schema: Document) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            slug: slug.into(),
            draft: DraftState { schema, version: INITIAL_VERSION },
            published: None,
        }
    }

    /// Apply a write request to this record's draft.
    pub fn write(&mut self, request: &WriteRequest) -> Result<&DraftState, WriteRejection> {
        self.draft = apply_write(&self.draft, request)?;
        Ok(&self.draft)
    }

    /// Snapshot the current draft as the published version.
    pub fn publish(&mut self) {
        self.published = Some(PublishedState { schema: self.draft.schema.clone() });
    }

    /// Reset the draft to the published snapshot. Counts as a write.
    pub fn revert(&mut self) -> Result<(), WriteRejection> {
        let published = self.published.as_ref().ok_or(WriteRejection::NotPublished)?;
        self.draft = DraftState { schema: published.schema.clone(), version: self.draft.version + 1 };
        Ok(())
    }

    pub fn rename(&mut self, update: &PageMetaUpdate) {
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(slug) = &update.slug {
            self.slug = slug.clone();
        }
    }

    /// Copy the draft into a new, unpublished record.
    ///
    /// Defaults: title gets a " (copy)" suffix, slug a "-copy" suffix.
    pub fn duplicate(&self, new_id: impl Into<String>, update: &PageMetaUpdate) -> PageRecord {
        let title = update.title.clone().unwrap_or_else(|| format!("{} (copy)", self.title));
        let slug = update.slug.clone().unwrap_or_else(|| format!("{}-copy", self.slug));
        PageRecord::new(new_id, title, slug, self.draft.schema.clone())
    }
}
