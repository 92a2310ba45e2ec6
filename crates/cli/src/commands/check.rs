// `pagedraft check`: sanitize and validate a candidate patch.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use pagedraft_common::patch::{sanitize, validate, PatchPolicy, ValidationReport};
use pagedraft_common::types::PatchOp;
use pagedraft_editor::config::EditorConfig;

use crate::exit_code::PatchRejected;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Patch file: a JSON array of operations (`-` for stdin).
    pub patch: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub sanitized: Vec<PatchOp>,
    pub report: ValidationReport,
}

pub fn run(args: CheckArgs, format: OutputFormat) -> anyhow::Result<()> {
    let ops: Vec<PatchOp> = super::read_json(&args.patch)?;
    let result = check(&ops, &EditorConfig::load().patch_policy());
    output::print_output(format, &result, format_human)?;

    if result.report.valid {
        Ok(())
    } else {
        Err(PatchRejected { report: result.report }.into())
    }
}

pub(crate) fn check(ops: &[PatchOp], policy: &PatchPolicy) -> CheckResult {
    let sanitized = sanitize(ops);
    let report = validate(&sanitized, policy);
    CheckResult { sanitized, report }
}

fn format_human(result: &CheckResult) -> String {
    if result.report.valid {
        return format!("ok: {} operation(s) pass validation", result.sanitized.len());
    }
    let mut lines = vec![format!("{} problem(s):", result.report.errors.len())];
    lines.extend(result.report.errors.iter().map(|issue| format!("  {issue}")));
    lines.join("\n")
}
