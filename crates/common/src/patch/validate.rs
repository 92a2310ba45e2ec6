// Patch validator: the trust boundary for candidate patches.
//
// A pure predicate over a whole patch. Every violation is collected; any
// violation rejects the patch as a unit.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::pointer::{is_index_like, parse_index, Pointer};
use crate::section::is_canonical;
use crate::types::{OpKind, PatchOp, DENSITY_VALUES, RADIUS_VALUES};

pub const DEFAULT_MAX_OPS: usize = 40;
pub const DEFAULT_MAX_BYTES: usize = 25 * 1024;

/// Size caps applied to a whole patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchPolicy {
    pub max_ops: usize,
    pub max_bytes: usize,
}

impl Default for PatchPolicy {
    fn default() -> Self {
        Self { max_ops: DEFAULT_MAX_OPS, max_bytes: DEFAULT_MAX_BYTES }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    TooManyOperations,
    PatchTooLarge,
    UnknownOp,
    PathNotAllowed,
    MissingValue,
    UnexpectedValue,
    BadValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Index of the offending operation; `None` for patch-level issues.
    pub index: Option<usize>,
    pub kind: IssueKind,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "op {index}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn has(&self, kind: IssueKind) -> bool {
        self.errors.iter().any(|issue| issue.kind == kind)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            return f.write_str("patch is valid");
        }
        let lines: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        f.write_str(&lines.join("; "))
    }
}

/// Validate `ops` against `policy`.
pub fn validate(ops: &[PatchOp], policy: &PatchPolicy) -> ValidationReport {
    let mut errors = Vec::new();

    if ops.len() > policy.max_ops {
        errors.push(ValidationIssue {
            index: None,
            kind: IssueKind::TooManyOperations,
            message: format!("too many operations: {} exceeds the limit of {}", ops.len(), policy.max_ops),
        });
    }

    let bytes = serde_json::to_vec(ops).map_or(usize::MAX, |encoded| encoded.len());
    if bytes > policy.max_bytes {
        errors.push(ValidationIssue {
            index: None,
            kind: IssueKind::PatchTooLarge,
            message: format!("patch is too large: {bytes} bytes exceeds the limit of {}", policy.max_bytes),
        });
    }

    for (index, op) in ops.iter().enumerate() {
        check_op(index, op, &mut errors);
    }

    ValidationReport { valid: errors.is_empty(), errors }
}

fn check_op(index: usize, op: &PatchOp, errors: &mut Vec<ValidationIssue>) {
    let mut issue = |kind: IssueKind, message: String| {
        errors.push(ValidationIssue { index: Some(index), kind, message });
    };

    if let OpKind::Unknown(raw) = &op.op {
        issue(IssueKind::UnknownOp, format!("unknown operation `{raw}`"));
    }

    match (&op.op, &op.value) {
        (OpKind::Add | OpKind::Replace, None) => {
            issue(IssueKind::MissingValue, format!("`{}` requires a value", op.op));
        }
        (OpKind::Remove, Some(_)) => {
            issue(IssueKind::UnexpectedValue, "`remove` must not carry a value".to_owned());
        }
        _ => {}
    }

    let Some(target) = Pointer::parse(&op.path).ok().and_then(|pointer| Target::classify(pointer.tokens()))
    else {
        issue(IssueKind::PathNotAllowed, format!("path not allowed: `{}`", op.path));
        return;
    };

    if let (true, Some(value)) = (op.op.requires_value(), &op.value) {
        if let Err(reason) = target.check_value(value) {
            issue(IssueKind::BadValue, format!("bad value at `{}`: {reason}", op.path));
        }
    }
}

// ── Allow-list ─────────────────────────────────────────────────────

/// An allow-listed location, with the value rule that applies there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Layout,
    Sections,
    SectionEntry,
    Content,
    Seo,
    NavLabel,
    NavHref,
    NavEntry,
    Translation,
    BrandColor,
    Radius,
    Density,
}

impl Target {
    fn classify(tokens: &[String]) -> Option<Self> {
        let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();
        let target = match tokens.as_slice() {
            ["layout"] => Self::Layout,
            ["sections"] => Self::Sections,
            ["sections", slot] if is_index_like(slot) => Self::SectionEntry,
            ["content", id, ..] if is_canonical(id) => Self::Content,
            ["seo", ..] => Self::Seo,
            ["nav", "items", slot] if is_index_like(slot) => Self::NavEntry,
            ["nav", "items", slot, "label"] if parse_index(slot).is_some() => Self::NavLabel,
            ["nav", "items", slot, "href"] if parse_index(slot).is_some() => Self::NavHref,
            ["translations", locale, key] if locale_pattern().is_match(locale) && !key.is_empty() => {
                Self::Translation
            }
            ["theme", "brandColor"] => Self::BrandColor,
            ["theme", "radius"] => Self::Radius,
            ["theme", "density"] => Self::Density,
            _ => return None,
        };
        Some(target)
    }

    fn check_value(self, value: &Value) -> Result<(), String> {
        match self {
            Self::Layout | Self::Content | Self::Seo => Ok(()),
            Self::Sections => {
                let entries = value.as_array().ok_or("expected an array of section ids")?;
                entries.iter().try_for_each(check_section_id)
            }
            Self::SectionEntry => check_section_id(value),
            Self::NavLabel | Self::Translation => {
                value.as_str().map(|_| ()).ok_or_else(|| "expected a string".to_owned())
            }
            Self::NavHref => check_href(value),
            Self::NavEntry => {
                let entry = value.as_object().ok_or("expected an object with `label` and `href`")?;
                entry
                    .get("label")
                    .and_then(Value::as_str)
                    .ok_or("nav entry needs a string `label`")?;
                check_href(entry.get("href").unwrap_or(&Value::Null))
            }
            Self::BrandColor => match value.as_str() {
                Some(color) if hex_color_pattern().is_match(color) => Ok(()),
                _ => Err(format!("expected a hex color, got {value}")),
            },
            Self::Radius => check_enum(value, RADIUS_VALUES),
            Self::Density => check_enum(value, DENSITY_VALUES),
        }
    }
}

fn check_section_id(value: &Value) -> Result<(), String> {
    match value.as_str() {
        Some(id) if is_canonical(id) => Ok(()),
        _ => Err(format!("{value} is not a known section id")),
    }
}

fn check_enum(value: &Value, allowed: &[&str]) -> Result<(), String> {
    match value.as_str() {
        Some(raw) if allowed.contains(&raw) => Ok(()),
        _ => Err(format!("expected one of {}, got {value}", allowed.join(", "))),
    }
}

fn check_href(value: &Value) -> Result<(), String> {
    let Some(href) = value.as_str() else {
        return Err("href must be a string".to_owned());
    };
    if href.starts_with('#') || (href.starts_with('/') && !href.starts_with("//")) {
        return Ok(());
    }
    match Url::parse(href) {
        Ok(url) if matches!(url.scheme(), "http" | "https" | "mailto") => Ok(()),
        Ok(url) => Err(format!("href scheme `{}` is not allowed", url.scheme())),
        Err(_) => Err(format!("`{href}` is not a relative path or absolute URL")),
    }
}

fn hex_color_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$")
            .expect("hex color pattern should compile")
    })
}

fn locale_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z]{2}(?:-[A-Z]{2})?$").expect("locale pattern should compile"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(ops: &[PatchOp]) -> ValidationReport {
        validate(ops, &PatchPolicy::default())
    }

    fn kinds(report: &ValidationReport) -> Vec<IssueKind> {
        report.errors.iter().map(|issue| issue.kind).collect()
    }

    // ── caps ───────────────────────────────────────────────────────

    #[test]
    fn fifty_adds_are_too_many_operations() {
        let ops = vec![PatchOp::add("/seo/title", json!("x")); 50];
        let report = check(&ops);
        assert!(!report.valid);
        assert_eq!(kinds(&report), vec![IssueKind::TooManyOperations]);
        assert!(report.errors[0].message.contains("too many operations"));
    }

    #[test]
    fn count_cap_still_reports_other_errors() {
        let mut ops = vec![PatchOp::add("/seo/title", json!("x")); 41];
        ops.push(PatchOp::add("/secrets/token", json!("x")));
        let report = check(&ops);
        assert!(report.has(IssueKind::TooManyOperations));
        assert!(report.has(IssueKind::PathNotAllowed));
    }

    #[test]
    fn byte_cap_rejects_large_patches() {
        let ops = vec![PatchOp::add("/seo/description", json!("x".repeat(26 * 1024)))];
        assert_eq!(kinds(&check(&ops)), vec![IssueKind::PatchTooLarge]);
    }

    #[test]
    fn custom_policy_caps_apply() {
        let policy = PatchPolicy { max_ops: 1, max_bytes: DEFAULT_MAX_BYTES };
        let ops = vec![PatchOp::remove("/seo/a"), PatchOp::remove("/seo/b")];
        assert!(validate(&ops, &policy).has(IssueKind::TooManyOperations));
    }

    // ── ops and values ─────────────────────────────────────────────

    #[test]
    fn unknown_op_is_reported() {
        let op = PatchOp { op: OpKind::Unknown("move".into()), path: "/seo/title".into(), value: None };
        assert_eq!(kinds(&check(&[op])), vec![IssueKind::UnknownOp]);
    }

    #[test]
    fn add_requires_value_and_remove_forbids_it() {
        let add = PatchOp { op: OpKind::Add, path: "/seo/title".into(), value: None };
        let remove = PatchOp { op: OpKind::Remove, path: "/seo/title".into(), value: Some(json!(1)) };
        let report = check(&[add, remove]);
        assert_eq!(kinds(&report), vec![IssueKind::MissingValue, IssueKind::UnexpectedValue]);
        assert_eq!(report.errors[1].index, Some(1));
    }

    // ── allow-list ─────────────────────────────────────────────────

    #[test]
    fn secrets_path_is_not_allowed() {
        let report = check(&[PatchOp::add("/secrets/token", json!("x"))]);
        assert_eq!(kinds(&report), vec![IssueKind::PathNotAllowed]);
        assert!(report.errors[0].message.contains("path not allowed"));
    }

    #[test]
    fn allow_listed_paths_pass() {
        let ops = vec![
            PatchOp::replace("/layout", json!("wide")),
            PatchOp::replace("/sections", json!(["hero", "cta"])),
            PatchOp::add("/sections/-", json!("faq_accordion")),
            PatchOp::remove("/sections/0"),
            PatchOp::replace("/content/hero", json!({ "title": "Hi" })),
            PatchOp::add("/content/hero/items/0/title", json!("x")),
            PatchOp::replace("/seo", json!({})),
            PatchOp::add("/seo/og/image", json!("/og.png")),
            PatchOp::replace("/nav/items/0/label", json!("Home")),
            PatchOp::replace("/nav/items/0/href", json!("https://example.com/a")),
            PatchOp::add("/nav/items/-", json!({ "label": "Docs", "href": "/docs" })),
            PatchOp::add("/translations/pt-BR/cta.title", json!("Comece")),
            PatchOp::replace("/theme/brandColor", json!("#fff")),
            PatchOp::replace("/theme/radius", json!("full")),
            PatchOp::replace("/theme/density", json!("compact")),
        ];
        let report = check(&ops);
        assert!(report.valid, "{report}");
    }

    #[test]
    fn disallowed_variants_of_allowed_prefixes() {
        let ops = vec![
            PatchOp::replace("/sections/0/title", json!("x")),
            PatchOp::replace("/content/blog/title", json!("x")),
            PatchOp::replace("/nav/items/-/label", json!("x")),
            PatchOp::replace("/nav/items/0/icon", json!("x")),
            PatchOp::replace("/nav", json!({})),
            PatchOp::add("/translations/english/title", json!("x")),
            PatchOp::add("/translations/en", json!({})),
            PatchOp::replace("/theme", json!({})),
            PatchOp::replace("", json!({})),
            PatchOp::replace("layout", json!("x")),
        ];
        let report = check(&ops);
        assert_eq!(report.errors.len(), ops.len());
        assert!(report.errors.iter().all(|issue| issue.kind == IssueKind::PathNotAllowed));
    }

    // ── value checks ───────────────────────────────────────────────

    #[test]
    fn brand_color_must_be_hex() {
        for good in ["#abc", "#A1B2C3", "#11223344"] {
            assert!(check(&[PatchOp::replace("/theme/brandColor", json!(good))]).valid, "{good}");
        }
        for bad in [json!("red"), json!("#abcd"), json!("#12345g"), json!(255)] {
            let report = check(&[PatchOp::replace("/theme/brandColor", bad)]);
            assert_eq!(kinds(&report), vec![IssueKind::BadValue]);
        }
    }

    #[test]
    fn enums_are_closed() {
        let report = check(&[
            PatchOp::replace("/theme/radius", json!("huge")),
            PatchOp::replace("/theme/density", json!("airy")),
        ]);
        assert_eq!(kinds(&report), vec![IssueKind::BadValue, IssueKind::BadValue]);
    }

    #[test]
    fn section_values_must_be_canonical() {
        let report = check(&[
            PatchOp::replace("/sections", json!(["hero", "pricing"])),
            PatchOp::add("/sections/-", json!("faq")),
            PatchOp::replace("/sections", json!("hero")),
        ]);
        assert_eq!(kinds(&report), vec![IssueKind::BadValue; 3]);
    }

    #[test]
    fn hrefs_are_restricted() {
        for good in ["/pricing", "#faq", "mailto:hi@example.com", "http://example.com"] {
            assert!(check(&[PatchOp::replace("/nav/items/0/href", json!(good))]).valid, "{good}");
        }
        for bad in ["javascript:alert(1)", "//evil.example", "pricing", "ftp://x.example"] {
            let report = check(&[PatchOp::replace("/nav/items/0/href", json!(bad))]);
            assert_eq!(kinds(&report), vec![IssueKind::BadValue], "{bad}");
        }
    }

    #[test]
    fn nav_entry_needs_label_and_href() {
        let report = check(&[
            PatchOp::add("/nav/items/-", json!({ "label": "Docs" })),
            PatchOp::add("/nav/items/0", json!("Docs")),
        ]);
        assert_eq!(kinds(&report), vec![IssueKind::BadValue, IssueKind::BadValue]);
    }

    #[test]
    fn translation_values_must_be_strings() {
        let report = check(&[PatchOp::add("/translations/en/title", json!({ "x": 1 }))]);
        assert_eq!(kinds(&report), vec![IssueKind::BadValue]);
    }

    #[test]
    fn validation_never_mutates_input() {
        let ops = vec![PatchOp::add("/secrets/token", json!("x"))];
        let before = ops.clone();
        let _ = check(&ops);
        assert_eq!(ops, before);
    }
}
