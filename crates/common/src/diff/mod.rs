// Structural diff between two documents.
//
// Produces a patch that turns `from` into `to` when applied in order.
// Mappings diff per key; sequences use a Myers edit script and pair
// neighbouring deletes and inserts into nested diffs. A sequence rewritten
// past the edit-script bound is replaced whole.

pub mod myers;

use serde_json::{Map, Value};

use crate::pointer::Pointer;
use crate::types::{Document, PatchOp};
use myers::Edit;

/// Compute the operations that transform `from` into `to`.
///
/// Empty iff the two documents are structurally equal.
pub fn diff(from: &Document, to: &Document) -> Vec<PatchOp> {
    let mut ops = Vec::new();
    diff_value(from, to, &Pointer::root(), &mut ops);
    ops
}

/// Whether two documents differ at all.
pub fn differs(from: &Document, to: &Document) -> bool {
    from != to
}

fn diff_value(from: &Value, to: &Value, at: &Pointer, ops: &mut Vec<PatchOp>) {
    if from == to {
        return;
    }
    match (from, to) {
        (Value::Object(a), Value::Object(b)) => diff_object(a, b, at, ops),
        (Value::Array(a), Value::Array(b)) => diff_array(a, b, at, ops),
        _ => ops.push(PatchOp::replace(at.to_string(), to.clone())),
    }
}

fn diff_object(from: &Map<String, Value>, to: &Map<String, Value>, at: &Pointer, ops: &mut Vec<PatchOp>) {
    for key in from.keys().filter(|key| !to.contains_key(*key)) {
        ops.push(PatchOp::remove(at.child(key.as_str()).to_string()));
    }
    for (key, old) in from {
        if let Some(new) = to.get(key) {
            diff_value(old, new, &at.child(key.as_str()), ops);
        }
    }
    for (key, new) in to.iter().filter(|(key, _)| !from.contains_key(*key)) {
        ops.push(PatchOp::add(at.child(key.as_str()).to_string(), new.clone()));
    }
}

fn diff_array(from: &[Value], to: &[Value], at: &Pointer, ops: &mut Vec<PatchOp>) {
    let Some(edits) = myers::edit_script(from, to) else {
        ops.push(PatchOp::replace(at.to_string(), Value::Array(to.to_vec())));
        return;
    };

    // Elements before `index` already match the head of `to`.
    let mut index = 0usize;
    let mut deleted: Vec<usize> = Vec::new();
    let mut inserted: Vec<usize> = Vec::new();

    for edit in edits {
        match edit {
            Edit::Equal { .. } => {
                index = flush_run(from, to, at, index, &mut deleted, &mut inserted, ops);
                index += 1;
            }
            Edit::Delete { old } => deleted.push(old),
            Edit::Insert { new } => inserted.push(new),
        }
    }
    flush_run(from, to, at, index, &mut deleted, &mut inserted, ops);
}

/// Emit ops for one run of changes starting at `index`; returns the index
/// just past the run in the updated sequence.
fn flush_run(
    from: &[Value],
    to: &[Value],
    at: &Pointer,
    index: usize,
    deleted: &mut Vec<usize>,
    inserted: &mut Vec<usize>,
    ops: &mut Vec<PatchOp>,
) -> usize {
    let paired = deleted.len().min(inserted.len());

    for (offset, (&old, &new)) in deleted.iter().zip(inserted.iter()).enumerate() {
        diff_value(&from[old], &to[new], &at.child((index + offset).to_string()), ops);
    }
    for _ in paired..deleted.len() {
        ops.push(PatchOp::remove(at.child((index + paired).to_string()).to_string()));
    }
    for (offset, &new) in inserted.iter().enumerate().skip(paired) {
        ops.push(PatchOp::add(at.child((index + offset).to_string()).to_string(), to[new].clone()));
    }

    let next = index + inserted.len();
    deleted.clear();
    inserted.clear();
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::apply_patch;
    use serde_json::json;

    fn assert_round_trip(from: Value, to: Value) -> Vec<PatchOp> {
        let ops = diff(&from, &to);
        assert_eq!(apply_patch(&from, &ops), to, "ops: {ops:?}");
        ops
    }

    // ── basics ─────────────────────────────────────────────────────

    #[test]
    fn equal_documents_have_empty_diff() {
        let doc = json!({ "sections": ["hero"], "seo": { "title": "x" } });
        assert!(diff(&doc, &doc.clone()).is_empty());
        assert!(!differs(&doc, &doc.clone()));
    }

    #[test]
    fn scalar_change_is_a_replace() {
        let ops = assert_round_trip(json!({ "seo": { "title": "a" } }), json!({ "seo": { "title": "b" } }));
        assert_eq!(ops, vec![PatchOp::replace("/seo/title", json!("b"))]);
    }

    #[test]
    fn root_type_change_replaces_root() {
        let ops = assert_round_trip(json!([1]), json!({ "a": 1 }));
        assert_eq!(ops, vec![PatchOp::replace("", json!({ "a": 1 }))]);
    }

    #[test]
    fn type_change_below_root_is_a_replace() {
        let ops = assert_round_trip(json!({ "layout": "wide" }), json!({ "layout": { "cols": 2 } }));
        assert_eq!(ops, vec![PatchOp::replace("/layout", json!({ "cols": 2 }))]);
    }

    // ── mappings ───────────────────────────────────────────────────

    #[test]
    fn mapping_keys_removed_changed_added() {
        let ops = assert_round_trip(
            json!({ "a": 1, "b": 2, "c": { "d": 1 } }),
            json!({ "b": 3, "c": { "d": 1 }, "e": null }),
        );
        assert_eq!(
            ops,
            vec![
                PatchOp::remove("/a"),
                PatchOp::replace("/b", json!(3)),
                PatchOp::add("/e", Value::Null),
            ]
        );
    }

    #[test]
    fn keys_with_slashes_and_tildes_are_escaped() {
        let ops = assert_round_trip(json!({}), json!({ "a/b": 1, "c~d": 2 }));
        let paths: Vec<&str> = ops.iter().map(|op| op.path.as_str()).collect();
        assert_eq!(paths, vec!["/a~1b", "/c~0d"]);
    }

    // ── sequences ──────────────────────────────────────────────────

    #[test]
    fn sequence_append_is_a_single_add() {
        let ops = assert_round_trip(json!({ "s": ["hero"] }), json!({ "s": ["hero", "cta"] }));
        assert_eq!(ops, vec![PatchOp::add("/s/1", json!("cta"))]);
    }

    #[test]
    fn sequence_removal_in_the_middle() {
        let ops = assert_round_trip(json!(["a", "b", "c"]), json!(["a", "c"]));
        assert_eq!(ops, vec![PatchOp::remove("/1")]);
    }

    #[test]
    fn nested_change_inside_sequence_element_is_targeted() {
        let ops = assert_round_trip(
            json!({ "nav": { "items": [{ "label": "Home", "href": "/" }, { "label": "Docs", "href": "/docs" }] } }),
            json!({ "nav": { "items": [{ "label": "Home", "href": "/" }, { "label": "Guides", "href": "/docs" }] } }),
        );
        assert_eq!(ops, vec![PatchOp::replace("/nav/items/1/label", json!("Guides"))]);
    }

    #[test]
    fn reorder_and_mixed_runs_round_trip() {
        assert_round_trip(json!(["hero", "features", "cta", "footer"]), json!(["cta", "hero", "team", "footer"]));
        assert_round_trip(json!([1, 2, 3, 4, 5]), json!([6, 2, 7, 8, 5, 9]));
        assert_round_trip(json!([]), json!([1, [2], { "x": 3 }]));
        assert_round_trip(json!([1, [2], { "x": 3 }]), json!([]));
        assert_round_trip(json!([[1, 2], [3]]), json!([[1], [3, 4], [5]]));
    }

    #[test]
    fn heavily_rewritten_sequence_is_replaced_whole() {
        let from = json!({ "items": (0..2_000).collect::<Vec<u32>>() });
        let to = json!({ "items": (2_000..4_000).collect::<Vec<u32>>() });
        let ops = assert_round_trip(from, to.clone());
        assert_eq!(ops, vec![PatchOp::replace("/items", to["items"].clone())]);
    }

    #[test]
    fn small_change_in_a_long_sequence_stays_granular() {
        let items: Vec<u32> = (0..3_000).collect();
        let mut changed = items.clone();
        changed[1_500] = 9_999;
        let ops = assert_round_trip(json!({ "items": items }), json!({ "items": changed }));
        assert_eq!(ops, vec![PatchOp::replace("/items/1500", json!(9_999))]);
    }
}
