// `pagedraft pull`: fetch a page's draft from the relay.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use pagedraft_common::protocol::pages::PageRecord;
use pagedraft_editor::retry::with_retry;
use pagedraft_editor::PageStore;

use super::RelayArgs;
use crate::client::Connection;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct PullArgs {
    /// Page id.
    pub page_id: String,

    /// Write the draft document here.
    #[arg(long, short)]
    pub out: Option<PathBuf>,

    #[command(flatten)]
    pub relay: RelayArgs,
}

#[derive(Debug, Serialize)]
pub struct PullResult {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub version: u64,
    pub published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written_to: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
}

pub async fn run(args: PullArgs, format: OutputFormat) -> anyhow::Result<()> {
    let conn = Connection::open(args.relay.base_url.as_deref())?;
    let policy = conn.config.retry_policy();
    let record = with_retry(&policy, || conn.store.fetch(&args.page_id))
        .await
        .with_context(|| format!("failed to pull page `{}`", args.page_id))?;

    if let Some(path) = &args.out {
        super::write_json(path, &record.draft.schema)?;
    }
    let result = summarize(record, args.out);
    output::print_output(format, &result, format_human)?;
    Ok(())
}

fn summarize(record: PageRecord, out: Option<PathBuf>) -> PullResult {
    let schema = out.is_none().then_some(record.draft.schema);
    PullResult {
        id: record.id,
        title: record.title,
        slug: record.slug,
        version: record.draft.version,
        published: record.published.is_some(),
        written_to: out,
        schema,
    }
}

fn format_human(result: &PullResult) -> String {
    let mut line = format!("{} ({}) at version {}", result.title, result.slug, result.version);
    if result.published {
        line.push_str(", published");
    }
    match (&result.written_to, &result.schema) {
        (Some(path), _) => format!("{line}\nwrote {}", path.display()),
        (None, Some(schema)) => {
            format!("{line}\n{}", serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string()))
        }
        (None, None) => line,
    }
}
