// Wire types for the page-record service.

use serde::{Deserialize, Serialize};

use crate::types::{Document, PatchOp};

// ── Routes ─────────────────────────────────────────────────────────
pub const HEALTH_PATH: &str = "/healthz";
pub const PAGES_PATH: &str = "/v1/pages";

// ── Records ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftState {
    pub schema: Document,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedState {
    pub schema: Document,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub draft: DraftState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<PublishedState>,
}

// ── Writes ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Replace the draft schema wholesale.
    Schema,
    /// Apply `patches` to the stored draft.
    Patches,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteRequest {
    pub mode: WriteMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patches: Option<Vec<PatchOp>>,
    pub base_version: u64,
}

impl WriteRequest {
    pub fn schema(schema: Document, base_version: u64) -> Self {
        Self { mode: WriteMode::Schema, schema: Some(schema), patches: None, base_version }
    }

    pub fn patches(patches: Vec<PatchOp>, base_version: u64) -> Self {
        Self { mode: WriteMode::Patches, schema: None, patches: Some(patches), base_version }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteResponse {
    pub draft: DraftState,
}

/// Body fields of a version-conflict response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictBody {
    pub current_version: u64,
}

// ── Actions ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePageRequest {
    pub title: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Document>,
}

/// Title/slug changes for rename and duplicate. Absent fields keep their
/// current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetaUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

// ── Version preconditions ──────────────────────────────────────────

/// Format a draft version as an `If-Match` value: `"<version>"`.
pub fn version_etag(version: u64) -> String {
    format!("\"{version}\"")
}

/// Parse an `If-Match` value back into a version.
///
/// Weak prefixes and quotes are tolerated. Returns `None` for anything
/// that is not a plain decimal version.
pub fn parse_version_etag(raw: &str) -> Option<u64> {
    let inner = normalize_etag(raw);
    if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    inner.parse().ok()
}

/// Strip optional `W/` prefix and surrounding quotes from an etag value.
pub fn normalize_etag(value: &str) -> &str {
    let trimmed = value.trim();
    let without_weak = trimmed.strip_prefix("W/").unwrap_or(trimmed);
    without_weak.strip_prefix('"').and_then(|v| v.strip_suffix('"')).unwrap_or(without_weak)
}
