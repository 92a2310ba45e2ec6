// Section sanitizer: canonicalize section ids in candidate patches.
//
// Runs before validation on patches from untrusted producers. Order is
// preserved, unmappable section content is dropped, and everything that
// does not touch sections passes through untouched.

use serde_json::Value;
use tracing::debug;

use crate::pointer::{is_index_like, Pointer};
use crate::section::canonicalize;
use crate::types::{OpKind, PatchOp};

/// Rewrite section ids in `ops` to their canonical form.
///
/// Total and deterministic; running it twice gives the same result as
/// running it once.
pub fn sanitize(ops: &[PatchOp]) -> Vec<PatchOp> {
    ops.iter().filter_map(sanitize_op).collect()
}

fn sanitize_op(op: &PatchOp) -> Option<PatchOp> {
    let Ok(pointer) = Pointer::parse(&op.path) else {
        return Some(op.clone());
    };

    match pointer.tokens() {
        [root] if root == "sections" => Some(sanitize_section_list(op)),
        [root, slot] if root == "sections" && is_index_like(slot) => sanitize_section_entry(op),
        [root, id, rest @ ..] if root == "content" => {
            let Some(canonical) = canonicalize(id) else {
                debug!(path = %op.path, "dropping content operation for unknown section");
                return None;
            };
            let path = Pointer::from_tokens(
                ["content", canonical].into_iter().map(str::to_owned).chain(rest.iter().cloned()),
            );
            Some(PatchOp { path: path.to_string(), ..op.clone() })
        }
        _ => Some(op.clone()),
    }
}

fn writes_value(op: &PatchOp) -> bool {
    matches!(op.op, OpKind::Add | OpKind::Replace)
}

fn sanitize_section_list(op: &PatchOp) -> PatchOp {
    let Some(Value::Array(entries)) = op.value.as_ref().filter(|_| writes_value(op)) else {
        return op.clone();
    };

    let mut ids: Vec<&'static str> = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry.as_str().and_then(canonicalize) {
            Some(id) if !ids.contains(&id) => ids.push(id),
            Some(_) => {}
            None => debug!(entry = %entry, "dropping unknown section id"),
        }
    }

    let value = Value::Array(ids.into_iter().map(Value::from).collect());
    PatchOp { value: Some(value), ..op.clone() }
}

fn sanitize_section_entry(op: &PatchOp) -> Option<PatchOp> {
    let Some(Value::String(raw)) = op.value.as_ref().filter(|_| writes_value(op)) else {
        return Some(op.clone());
    };

    match canonicalize(raw) {
        Some(id) => Some(PatchOp { value: Some(Value::from(id)), ..op.clone() }),
        None => {
            debug!(path = %op.path, entry = %raw, "dropping unknown section entry");
            None
        }
    }
}
