// `pagedraft diff`: the patch that turns one document into another.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use pagedraft_common::diff::diff;
use pagedraft_common::types::{Document, PatchOp};

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Source document (`-` for stdin).
    pub from: PathBuf,
    /// Target document.
    pub to: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct DiffResult {
    pub patches: Vec<PatchOp>,
}

pub fn run(args: DiffArgs, format: OutputFormat) -> anyhow::Result<()> {
    let from: Document = super::read_json(&args.from)?;
    let to: Document = super::read_json(&args.to)?;
    let result = DiffResult { patches: diff(&from, &to) };
    output::print_output(format, &result, format_human)?;
    Ok(())
}

fn format_human(result: &DiffResult) -> String {
    if result.patches.is_empty() {
        return "Documents are identical.".into();
    }
    result.patches.iter().map(describe_op).collect::<Vec<_>>().join("\n")
}

pub(crate) fn describe_op(op: &PatchOp) -> String {
    match &op.value {
        Some(value) => format!("{:<7} {} = {}", op.op, op.path, value),
        None => format!("{:<7} {}", op.op, op.path),
    }
}
