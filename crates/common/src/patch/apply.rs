// Patch applier.
//
// Applies operations in order to a deep clone of the input. A failing
// operation is logged and skipped; the rest of the batch still applies and
// the failed operation leaves no trace in the clone.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::pointer::{
    self, array_slot, is_index_like, ArraySlot, Pointer, PointerError, APPEND_TOKEN,
};
use crate::types::{Document, OpKind, PatchOp};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error(transparent)]
    Pointer(#[from] PointerError),
    #[error("`{0}` requires a value")]
    MissingValue(OpKind),
    #[error("unsupported operation `{0}`")]
    UnsupportedOp(String),
    #[error("parent of `{0}` does not exist")]
    MissingParent(String),
    #[error("`{0}` does not exist")]
    MissingTarget(String),
    #[error("index {index} is out of bounds at `{path}`")]
    OutOfBounds { path: String, index: usize },
    #[error("`{token}` is not an array index at `{path}`")]
    NotAnIndex { path: String, token: String },
    #[error("cannot descend into a scalar at `{0}`")]
    NotAContainer(String),
    #[error("the document root cannot be removed")]
    RootRemoval,
    #[error("cannot create `{0}`: a new array only accepts index 0 or `-`")]
    SparseArray(String),
}

/// An operation the applier skipped, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedOp {
    pub index: usize,
    pub op: PatchOp,
    pub reason: PatchError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatchOutcome {
    pub document: Document,
    pub skipped: Vec<SkippedOp>,
}

impl PatchOutcome {
    pub fn fully_applied(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Apply `ops` to a clone of `doc`. The input is never mutated.
pub fn apply_patch(doc: &Document, ops: &[PatchOp]) -> Document {
    apply_patch_with_report(doc, ops).document
}

/// Like [`apply_patch`] but also reports which operations were skipped.
pub fn apply_patch_with_report(doc: &Document, ops: &[PatchOp]) -> PatchOutcome {
    let mut document = doc.clone();
    let mut skipped = Vec::new();

    for (index, op) in ops.iter().enumerate() {
        if let Err(reason) = apply_op(&mut document, op) {
            warn!(
                index,
                op = %op.op,
                path = %op.path,
                error = %reason,
                "skipping inapplicable patch operation"
            );
            skipped.push(SkippedOp { index, op: op.clone(), reason });
        }
    }

    PatchOutcome { document, skipped }
}

/// Apply a single operation in place.
///
/// On error `doc` is left exactly as it was.
pub fn apply_op(doc: &mut Value, op: &PatchOp) -> Result<(), PatchError> {
    let pointer = Pointer::parse(&op.path)?;
    match &op.op {
        OpKind::Add => add(doc, &pointer, required_value(op)?),
        OpKind::Replace => replace(doc, &pointer, required_value(op)?),
        OpKind::Remove => remove(doc, &pointer),
        OpKind::Unknown(raw) => Err(PatchError::UnsupportedOp(raw.clone())),
    }
}

fn required_value(op: &PatchOp) -> Result<Value, PatchError> {
    op.value.clone().ok_or_else(|| PatchError::MissingValue(op.op.clone()))
}

// ── add ────────────────────────────────────────────────────────────

fn add(doc: &mut Value, pointer: &Pointer, value: Value) -> Result<(), PatchError> {
    let tokens = pointer.tokens();
    let Some((last, head)) = tokens.split_last() else {
        *doc = value;
        return Ok(());
    };

    let existing = existing_prefix_len(doc, head)?;

    // Missing intermediate containers are built off-tree and attached in
    // one step, so a failure cannot leave half-created containers behind.
    let (attach_token, attach_value) = if existing < head.len() {
        let missing = &tokens[existing + 1..];
        let subtree = build_missing(missing, value, pointer)?;
        (head[existing].as_str(), subtree)
    } else {
        (last.as_str(), value)
    };

    let container_path = &head[..existing];
    let container = walk_mut(doc, container_path)
        .ok_or_else(|| PatchError::MissingParent(pointer.to_string()))?;
    insert(container, attach_token, attach_value, pointer)
}

/// Number of leading `head` tokens that already resolve.
fn existing_prefix_len(doc: &Value, head: &[String]) -> Result<usize, PatchError> {
    let mut node = doc;
    let mut existing = 0;

    for token in head {
        match node {
            Value::Object(map) => match map.get(token) {
                Some(next) => node = next,
                None => break,
            },
            Value::Array(items) => match array_slot(token, items.len()) {
                ArraySlot::Index(index) => node = &items[index],
                ArraySlot::End => break,
                ArraySlot::OutOfBounds(index) => {
                    return Err(PatchError::OutOfBounds { path: prefix(head, existing), index })
                }
                ArraySlot::NotAnIndex => {
                    return Err(PatchError::NotAnIndex {
                        path: prefix(head, existing),
                        token: token.clone(),
                    })
                }
            },
            _ => return Err(PatchError::NotAContainer(prefix(head, existing))),
        }
        existing += 1;
    }

    Ok(existing)
}

/// Wrap `value` in new containers for each missing token, innermost first.
///
/// The container type for a token is chosen by the token itself: numeric or
/// `-` makes a sequence, anything else a mapping.
fn build_missing(tokens: &[String], value: Value, pointer: &Pointer) -> Result<Value, PatchError> {
    tokens.iter().rev().try_fold(value, |inner, token| {
        if is_index_like(token) {
            if token == APPEND_TOKEN || token == "0" {
                Ok(Value::Array(vec![inner]))
            } else {
                Err(PatchError::SparseArray(pointer.to_string()))
            }
        } else {
            let mut map = Map::new();
            map.insert(token.clone(), inner);
            Ok(Value::Object(map))
        }
    })
}

fn insert(container: &mut Value, token: &str, value: Value, pointer: &Pointer) -> Result<(), PatchError> {
    match container {
        Value::Object(map) => {
            map.insert(token.to_owned(), value);
            Ok(())
        }
        Value::Array(items) => match array_slot(token, items.len()) {
            ArraySlot::Index(index) => {
                items.insert(index, value);
                Ok(())
            }
            ArraySlot::End => {
                items.push(value);
                Ok(())
            }
            ArraySlot::OutOfBounds(index) => {
                Err(PatchError::OutOfBounds { path: pointer.to_string(), index })
            }
            ArraySlot::NotAnIndex => Err(PatchError::NotAnIndex {
                path: pointer.to_string(),
                token: token.to_owned(),
            }),
        },
        _ => Err(PatchError::NotAContainer(pointer.to_string())),
    }
}

fn walk_mut<'a>(doc: &'a mut Value, tokens: &[String]) -> Option<&'a mut Value> {
    tokens.iter().try_fold(doc, |node, token| match node {
        Value::Object(map) => map.get_mut(token),
        Value::Array(items) => match array_slot(token, items.len()) {
            ArraySlot::Index(index) => items.get_mut(index),
            _ => None,
        },
        _ => None,
    })
}

fn prefix(tokens: &[String], len: usize) -> String {
    Pointer::from_tokens(tokens[..len].iter().cloned()).to_string()
}

// ── replace / remove ───────────────────────────────────────────────

fn replace(doc: &mut Value, pointer: &Pointer, value: Value) -> Result<(), PatchError> {
    if pointer.is_root() {
        *doc = value;
        return Ok(());
    }

    let resolution = pointer::resolve(doc, pointer);
    if !resolution.resolves() {
        return Err(if resolution.parent.is_some() {
            PatchError::MissingTarget(pointer.to_string())
        } else {
            PatchError::MissingParent(pointer.to_string())
        });
    }

    match pointer::get_mut(doc, pointer) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(PatchError::MissingTarget(pointer.to_string())),
    }
}

fn remove(doc: &mut Value, pointer: &Pointer) -> Result<(), PatchError> {
    if pointer.is_root() {
        return Err(PatchError::RootRemoval);
    }

    let removed = match pointer::parent_mut(doc, pointer) {
        Some((Value::Object(map), key)) => map.remove(key).is_some(),
        Some((Value::Array(items), key)) => match array_slot(key, items.len()) {
            ArraySlot::Index(index) => {
                items.remove(index);
                true
            }
            _ => false,
        },
        _ => false,
    };

    if !removed {
        debug!(path = %pointer, "remove target does not resolve; nothing to do");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn apply_one(doc: &Value, op: PatchOp) -> PatchOutcome {
        apply_patch_with_report(doc, &[op])
    }

    // ── add ────────────────────────────────────────────────────────

    #[test]
    fn add_sets_object_key() {
        let doc = json!({ "seo": {} });
        let out = apply_patch(&doc, &[PatchOp::add("/seo/title", json!("Hello"))]);
        assert_eq!(out, json!({ "seo": { "title": "Hello" } }));
    }

    #[test]
    fn add_inserts_into_array_and_appends() {
        let doc = json!({ "sections": ["hero", "cta"] });
        let out = apply_patch(
            &doc,
            &[
                PatchOp::add("/sections/1", json!("features")),
                PatchOp::add("/sections/-", json!("footer")),
                PatchOp::add("/sections/4", json!("team")),
            ],
        );
        assert_eq!(out["sections"], json!(["hero", "features", "cta", "footer", "team"]));
    }

    #[test]
    fn add_at_root_replaces_document() {
        let out = apply_patch(&json!({ "a": 1 }), &[PatchOp::add("", json!({ "b": 2 }))]);
        assert_eq!(out, json!({ "b": 2 }));
    }

    #[test]
    fn add_creates_missing_mapping_parents() {
        let doc = json!({});
        let out = apply_patch(&doc, &[PatchOp::add("/content/hero/title", json!("Hi"))]);
        assert_eq!(out, json!({ "content": { "hero": { "title": "Hi" } } }));
    }

    #[test]
    fn add_infers_sequence_from_numeric_next_segment() {
        let doc = json!({ "nav": {} });
        let out = apply_patch(&doc, &[PatchOp::add("/nav/items/0/label", json!("Home"))]);
        assert_eq!(out, json!({ "nav": { "items": [{ "label": "Home" }] } }));
    }

    #[test]
    fn add_infers_sequence_from_append_next_segment() {
        let doc = json!({});
        let out = apply_patch(&doc, &[PatchOp::add("/content/faq_accordion/items/-", json!("q"))]);
        assert_eq!(out, json!({ "content": { "faq_accordion": { "items": ["q"] } } }));
    }

    #[test]
    fn add_deep_mixed_missing_path() {
        let doc = json!({ "content": {} });
        let out = apply_patch(
            &doc,
            &[PatchOp::add("/content/team/members/-/links/0/href", json!("/about"))],
        );
        assert_eq!(
            out,
            json!({ "content": { "team": { "members": [{ "links": [{ "href": "/about" }] }] } } })
        );
    }

    #[test]
    fn add_appends_new_container_to_existing_array() {
        let doc = json!({ "nav": { "items": [{ "label": "Home" }] } });
        let out = apply_patch(&doc, &[PatchOp::add("/nav/items/1/label", json!("Docs"))]);
        assert_eq!(out["nav"]["items"], json!([{ "label": "Home" }, { "label": "Docs" }]));
    }

    #[test]
    fn add_sparse_index_into_missing_sequence_is_skipped_without_residue() {
        let doc = json!({ "nav": {} });
        let out = apply_one(&doc, PatchOp::add("/nav/items/3/label", json!("x")));
        assert_eq!(out.document, doc);
        assert_eq!(out.skipped.len(), 1);
        assert!(matches!(out.skipped[0].reason, PatchError::SparseArray(_)));
    }

    #[test]
    fn add_numeric_key_under_existing_mapping_stays_mapping() {
        let doc = json!({ "translations": { "en": {} } });
        let out = apply_patch(&doc, &[PatchOp::add("/translations/en/404", json!("Not found"))]);
        assert_eq!(out["translations"]["en"]["404"], "Not found");
    }

    #[test]
    fn add_out_of_bounds_is_skipped() {
        let doc = json!({ "sections": ["hero"] });
        let out = apply_one(&doc, PatchOp::add("/sections/5", json!("cta")));
        assert_eq!(out.document, doc);
        assert!(matches!(out.skipped[0].reason, PatchError::OutOfBounds { index: 5, .. }));
    }

    #[test]
    fn add_through_scalar_is_skipped() {
        let doc = json!({ "seo": "flat" });
        let out = apply_one(&doc, PatchOp::add("/seo/title", json!("x")));
        assert_eq!(out.document, doc);
        assert!(matches!(out.skipped[0].reason, PatchError::NotAContainer(_)));
    }

    #[test]
    fn add_without_value_is_skipped() {
        let doc = json!({});
        let op = PatchOp { op: OpKind::Add, path: "/seo".into(), value: None };
        let out = apply_one(&doc, op);
        assert_eq!(out.skipped[0].reason, PatchError::MissingValue(OpKind::Add));
    }

    #[test]
    fn add_null_value_is_a_value() {
        let out = apply_patch(&json!({}), &[PatchOp::add("/layout", Value::Null)]);
        assert_eq!(out, json!({ "layout": null }));
    }

    // ── replace ────────────────────────────────────────────────────

    #[test]
    fn replace_existing_value() {
        let doc = json!({ "theme": { "radius": "md" } });
        let out = apply_patch(&doc, &[PatchOp::replace("/theme/radius", json!("lg"))]);
        assert_eq!(out["theme"]["radius"], "lg");
    }

    #[test]
    fn replace_missing_key_is_skipped() {
        let doc = json!({ "theme": {} });
        let out = apply_one(&doc, PatchOp::replace("/theme/radius", json!("lg")));
        assert_eq!(out.document, doc);
        assert_eq!(out.skipped[0].reason, PatchError::MissingTarget("/theme/radius".into()));
    }

    #[test]
    fn replace_never_creates_parents() {
        let doc = json!({});
        let out = apply_one(&doc, PatchOp::replace("/theme/radius", json!("lg")));
        assert_eq!(out.document, doc);
        assert_eq!(out.skipped[0].reason, PatchError::MissingParent("/theme/radius".into()));
    }

    #[test]
    fn replace_append_token_is_skipped() {
        let doc = json!({ "sections": ["hero"] });
        let out = apply_one(&doc, PatchOp::replace("/sections/-", json!("cta")));
        assert_eq!(out.document, doc);
        assert_eq!(out.skipped.len(), 1);
    }

    #[test]
    fn replace_root() {
        let out = apply_patch(&json!([1]), &[PatchOp::replace("", json!({}))]);
        assert_eq!(out, json!({}));
    }

    // ── remove ─────────────────────────────────────────────────────

    #[test]
    fn remove_key_and_index() {
        let doc = json!({ "seo": { "title": "x" }, "sections": ["hero", "cta"] });
        let out =
            apply_patch(&doc, &[PatchOp::remove("/seo/title"), PatchOp::remove("/sections/0")]);
        assert_eq!(out, json!({ "seo": {}, "sections": ["cta"] }));
    }

    #[test]
    fn remove_missing_path_is_a_silent_no_op() {
        let doc = json!({ "seo": {} });
        let out = apply_one(&doc, PatchOp::remove("/content/hero/title"));
        assert_eq!(out.document, doc);
        assert!(out.fully_applied());
    }

    #[test]
    fn remove_root_is_skipped() {
        let out = apply_one(&json!({ "a": 1 }), PatchOp::remove(""));
        assert_eq!(out.skipped[0].reason, PatchError::RootRemoval);
    }

    // ── batch behavior ─────────────────────────────────────────────

    #[test]
    fn failing_operation_does_not_abort_batch() {
        let doc = json!({ "seo": {}, "sections": [] });
        let ops = vec![
            PatchOp::add("/seo/title", json!("A")),
            PatchOp::replace("/missing/key", json!(1)),
            PatchOp { op: OpKind::Unknown("move".into()), path: "/seo".into(), value: None },
            PatchOp::add("bad-pointer", json!(1)),
            PatchOp::add("/sections/-", json!("hero")),
        ];
        let out = apply_patch_with_report(&doc, &ops);

        assert_eq!(out.document, json!({ "seo": { "title": "A" }, "sections": ["hero"] }));
        let skipped: Vec<usize> = out.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![1, 2, 3]);
    }

    #[test]
    fn operations_apply_in_order() {
        let doc = json!({ "sections": [] });
        let ops = vec![
            PatchOp::add("/sections/-", json!("hero")),
            PatchOp::replace("/sections/0", json!("cta")),
            PatchOp::add("/sections/0", json!("features")),
        ];
        assert_eq!(apply_patch(&doc, &ops)["sections"], json!(["features", "cta"]));
    }

    #[test]
    fn input_document_is_never_mutated() {
        let doc = json!({ "seo": { "title": "x" } });
        let before = doc.clone();
        let _ = apply_patch(&doc, &[PatchOp::remove("/seo"), PatchOp::add("/a", json!(1))]);
        assert_eq!(doc, before);
    }
}
