// `pagedraft apply`: apply a patch file to a local document.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use pagedraft_common::patch::{apply_patch_with_report, PatchPolicy};
use pagedraft_common::types::{Document, PatchOp};
use pagedraft_editor::config::EditorConfig;

use crate::exit_code::PatchRejected;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Document to patch (`-` for stdin). Never modified unless `--out` names it.
    pub doc: PathBuf,

    /// Patch file: a JSON array of operations.
    pub patch: PathBuf,

    /// Write the patched document here instead of printing it.
    #[arg(long, short)]
    pub out: Option<PathBuf>,

    /// Skip sanitizing and validation (the patch is from a trusted producer).
    #[arg(long)]
    pub trusted: bool,
}

#[derive(Debug, Serialize)]
pub struct ApplyResult {
    pub document: Document,
    pub applied: usize,
    pub skipped: Vec<SkippedEntry>,
}

#[derive(Debug, Serialize)]
pub struct SkippedEntry {
    pub index: usize,
    pub path: String,
    pub reason: String,
}

pub fn run(args: ApplyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let doc: Document = super::read_json(&args.doc)?;
    let ops: Vec<PatchOp> = super::read_json(&args.patch)?;
    let policy = (!args.trusted).then(|| EditorConfig::load().patch_policy());

    let result = apply(&doc, &ops, policy.as_ref())?;
    for entry in &result.skipped {
        output::print_warning(
            format,
            "OP_SKIPPED",
            &format!("op {} at {} skipped: {}", entry.index, entry.path, entry.reason),
        );
    }

    match &args.out {
        Some(path) => {
            super::write_json(path, &result.document)?;
            output::print_output(format, &result, |r| {
                format!("wrote {} ({} applied, {} skipped)", path.display(), r.applied, r.skipped.len())
            })?;
        }
        None => output::print_output(format, &result, |r| {
            serde_json::to_string_pretty(&r.document).unwrap_or_else(|_| r.document.to_string())
        })?,
    }
    Ok(())
}

/// Sanitize and validate (unless trusted), then apply tolerantly.
pub(crate) fn apply(doc: &Document, ops: &[PatchOp], policy: Option<&PatchPolicy>) -> anyhow::Result<ApplyResult> {
    let ops = match policy {
        Some(policy) => {
            let checked = super::check::check(ops, policy);
            if !checked.report.valid {
                return Err(PatchRejected { report: checked.report }.into());
            }
            checked.sanitized
        }
        None => ops.to_vec(),
    };

    let outcome = apply_patch_with_report(doc, &ops);
    let skipped: Vec<SkippedEntry> = outcome
        .skipped
        .iter()
        .map(|skip| SkippedEntry { index: skip.index, path: skip.op.path.clone(), reason: skip.reason.to_string() })
        .collect();

    Ok(ApplyResult { applied: ops.len() - skipped.len(), skipped, document: outcome.document })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use crate::exit_code::{ExitCode, PatchRejected};

    use super::*;

    fn page() -> Document {
        json!({ "seo": { "title": "Home" }, "sections": ["hero"], "content": {} })
    }

    #[test]
    fn applies_and_reports_skips() {
        let ops = vec![
            PatchOp::replace("/seo/title", json!("Welcome")),
            PatchOp::add("/sections/9", json!("cta")),
            PatchOp::add("/sections/-", json!("faq")),
        ];
        let result = apply(&page(), &ops, Some(&PatchPolicy::default())).unwrap();

        assert_eq!(result.document["seo"]["title"], "Welcome");
        assert_eq!(result.document["sections"], json!(["hero", "faq_accordion"]));
        assert_eq!(result.applied, 2);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].index, 1);
    }

    #[test]
    fn invalid_patch_is_rejected_whole() {
        let ops = vec![PatchOp::replace("/seo/title", json!("ok")), PatchOp::add("/secrets/token", json!("x"))];
        let err = apply(&page(), &ops, Some(&PatchPolicy::default())).unwrap_err();
        assert!(err.downcast_ref::<PatchRejected>().is_some());
        assert_eq!(ExitCode::from_error(&err), ExitCode::InvalidPatch);
    }

    #[test]
    fn trusted_patch_bypasses_policy() {
        let ops = vec![PatchOp::add("/internal", json!({ "flag": true }))];
        let result = apply(&page(), &ops, None).unwrap();
        assert_eq!(result.document["internal"]["flag"], true);
    }

    #[test]
    fn out_file_round_trips() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("patched.json");
        let result = apply(&page(), &[PatchOp::replace("/seo/title", json!("Saved"))], None).unwrap();
        crate::commands::write_json(&out, &result.document).unwrap();

        let back: Document = crate::commands::read_json(&out).unwrap();
        assert_eq!(back["seo"]["title"], "Saved");
    }
}
