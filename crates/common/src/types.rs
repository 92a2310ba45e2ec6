// Core domain types shared across all pagedraft crates.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A page document: an untyped JSON tree.
///
/// Section content is arbitrary per section, so the document is validated
/// structurally at the patch boundary instead of being statically typed.
pub type Document = Value;

/// An ordered sequence of operations. Order is significant.
pub type Patch = Vec<PatchOp>;

/// Operation kind of a single patch operation.
///
/// Deserializes from any string so that untrusted input with an unknown
/// operation still parses; the validator reports `Unknown` kinds and the
/// applier skips them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OpKind {
    Add,
    Replace,
    Remove,
    Unknown(String),
}

impl OpKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Add => "add",
            Self::Replace => "replace",
            Self::Remove => "remove",
            Self::Unknown(raw) => raw,
        }
    }

    /// `add` and `replace` carry a value; `remove` must not.
    pub fn requires_value(&self) -> bool {
        matches!(self, Self::Add | Self::Replace)
    }
}

impl From<String> for OpKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "add" => Self::Add,
            "replace" => Self::Replace,
            "remove" => Self::Remove,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<OpKind> for String {
    fn from(kind: OpKind) -> Self {
        kind.as_str().to_owned()
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single declarative mutation at a pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    pub op: OpKind,
    pub path: String,
    #[serde(default, deserialize_with = "present_value", skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

// A present `"value": null` is a value; only an absent field is `None`.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl PatchOp {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self { op: OpKind::Add, path: path.into(), value: Some(value) }
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self { op: OpKind::Replace, path: path.into(), value: Some(value) }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self { op: OpKind::Remove, path: path.into(), value: None }
    }
}

/// Allowed values for `theme.radius`.
pub const RADIUS_VALUES: &[&str] = &["none", "sm", "md", "lg", "full"];

/// Allowed values for `theme.density`.
pub const DENSITY_VALUES: &[&str] = &["compact", "comfortable", "spacious"];

/// Default page skeleton used when a page is created without a schema.
pub fn empty_page() -> Document {
    json!({
        "theme": {
            "brandColor": "#2563eb",
            "radius": "md",
            "density": "comfortable",
        },
        "sections": [],
        "content": {},
        "seo": {},
        "nav": { "items": [] },
        "translations": {},
    })
}
