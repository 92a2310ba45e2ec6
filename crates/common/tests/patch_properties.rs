use proptest::collection::{btree_map, vec};
use proptest::prelude::*;
use pagedraft_common::diff::diff;
use pagedraft_common::patch::{apply_patch, apply_patch_with_report, sanitize};
use pagedraft_common::types::{OpKind, PatchOp};
use serde_json::{json, Map, Value};

fn key() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("hero".to_owned()),
        Just("title".to_owned()),
        Just("items".to_owned()),
        Just("0".to_owned()),
        Just("a/b".to_owned()),
        Just("c~d".to_owned()),
        Just("-".to_owned()),
        "[a-z]{1,6}",
    ]
}

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (-50i64..50).prop_map(Value::from),
        "[a-z ]{0,8}".prop_map(Value::from),
    ]
}

fn document() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            vec(inner.clone(), 0..6).prop_map(Value::Array),
            btree_map(key(), inner, 0..6).prop_map(|map| Value::Object(map.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

/// Two related documents: `after` is `before` with some random edits, so the
/// diff exercises nested paths rather than a single root replace.
fn related_pair() -> impl Strategy<Value = (Value, Value)> {
    (document(), document(), vec(any::<bool>(), 0..4)).prop_map(|(before, extra, flips)| {
        let mut after = before.clone();
        if let Value::Object(map) = &mut after {
            for (index, flip) in flips.into_iter().enumerate() {
                let key = format!("k{index}");
                if flip {
                    map.insert(key, extra.clone());
                } else {
                    map.remove(&key);
                }
            }
        } else if let Value::Array(items) = &mut after {
            items.push(extra);
            let mid = items.len() / 2;
            items.rotate_left(mid);
        }
        (before, after)
    })
}

fn candidate_op() -> impl Strategy<Value = PatchOp> {
    let section_name = prop_oneof![
        Just("pricing"),
        Just("faq"),
        Just("FAQs"),
        Just("contact"),
        Just("feature-detail"),
        Just("hero"),
        Just("blog"),
        Just("newsletter"),
    ];
    let path = prop_oneof![
        Just("/sections".to_owned()),
        Just("/sections/-".to_owned()),
        Just("/sections/0".to_owned()),
        section_name.clone().prop_map(|name| format!("/content/{name}/title")),
        Just("/seo/title".to_owned()),
        Just("/theme/radius".to_owned()),
    ];
    let value = prop_oneof![
        vec(section_name.clone(), 0..8).prop_map(|names| json!(names)),
        section_name.prop_map(Value::from),
        leaf(),
    ];
    let op = prop_oneof![Just(OpKind::Add), Just(OpKind::Replace), Just(OpKind::Remove)];

    (op, path, value).prop_map(|(op, path, value)| {
        let value = if op == OpKind::Remove { None } else { Some(value) };
        PatchOp { op, path, value }
    })
}

fn arbitrary_op() -> impl Strategy<Value = PatchOp> {
    let path = prop_oneof![
        Just(String::new()),
        Just("/-".to_owned()),
        Just("no-slash".to_owned()),
        Just("/bad~2".to_owned()),
        vec(key(), 1..5).prop_map(|tokens| {
            tokens.iter().map(|t| format!("/{}", t.replace('~', "~0").replace('/', "~1"))).collect::<String>()
        }),
    ];
    let op = prop_oneof![
        Just(OpKind::Add),
        Just(OpKind::Replace),
        Just(OpKind::Remove),
        Just(OpKind::Unknown("move".into())),
    ];
    (op, path, proptest::option::of(leaf())).prop_map(|(op, path, value)| PatchOp { op, path, value })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        max_shrink_iters: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn applying_a_diff_reaches_the_target(before in document(), after in document()) {
        let ops = diff(&before, &after);
        prop_assert_eq!(apply_patch(&before, &ops), after);
    }

    #[test]
    fn applying_a_diff_between_related_documents_reaches_the_target((before, after) in related_pair()) {
        let ops = diff(&before, &after);
        let outcome = apply_patch_with_report(&before, &ops);
        prop_assert!(outcome.skipped.is_empty(), "skipped: {:?}", outcome.skipped);
        prop_assert_eq!(outcome.document, after);
    }

    #[test]
    fn a_document_has_no_diff_with_itself(doc in document()) {
        prop_assert!(diff(&doc, &doc.clone()).is_empty());
    }

    #[test]
    fn apply_never_mutates_its_input(doc in document(), ops in vec(arbitrary_op(), 0..12)) {
        let before = doc.clone();
        let _ = apply_patch_with_report(&doc, &ops);
        prop_assert_eq!(doc, before);
    }

    #[test]
    fn skipped_ops_leave_no_trace(doc in document(), op in arbitrary_op()) {
        let outcome = apply_patch_with_report(&doc, std::slice::from_ref(&op));
        if !outcome.skipped.is_empty() {
            prop_assert_eq!(outcome.document, doc);
        }
    }

    #[test]
    fn sanitize_is_idempotent(ops in vec(candidate_op(), 0..12)) {
        let once = sanitize(&ops);
        prop_assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn sanitize_preserves_order_of_kept_ops(ops in vec(candidate_op(), 0..12)) {
        let out = sanitize(&ops);
        prop_assert!(out.len() <= ops.len());
        let untouched: Vec<&PatchOp> = ops.iter().filter(|op| op.path == "/seo/title" || op.path == "/theme/radius").collect();
        let kept: Vec<&PatchOp> = out.iter().filter(|op| op.path == "/seo/title" || op.path == "/theme/radius").collect();
        prop_assert_eq!(untouched, kept);
    }

    #[test]
    fn sanitized_section_lists_have_no_duplicates(ops in vec(candidate_op(), 0..12)) {
        for op in sanitize(&ops) {
            if let (true, Some(Value::Array(ids))) = (op.path == "/sections", &op.value) {
                let mut seen = std::collections::HashSet::new();
                prop_assert!(ids.iter().all(|id| seen.insert(id.to_string())));
            }
        }
    }
}

#[test]
fn sanitizer_scenario() {
    let ops = vec![PatchOp::replace("/sections", json!(["pricing", "faq", "contact", "feature-detail"]))];
    assert_eq!(
        sanitize(&ops),
        vec![PatchOp::replace("/sections", json!(["pricing_tiered", "faq_accordion", "cta", "features"]))]
    );
}
