// `pagedraft publish` / `pagedraft revert`.

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
pub struct PublishArgs {
    /// Page id.
    pub page_id: String,

    #[command(flatten)]
    pub relay: RelayArgs,
}

#[derive(Debug, Serialize)]
pub struct ActionResult {
    pub action: &'static str,
    pub id: String,
    pub version: u64,
    pub published: bool,
}

pub async fn run_publish(args: PublishArgs, format: OutputFormat) -> anyhow::Result<()> {
    let conn = Connection::open(args.relay.base_url.as_deref())?;
    conn.ready().await?;
    let policy = conn.config.retry_policy();
    let record = with_retry(&policy, || conn.store.publish(&args.page_id))
        .await
        .with_context(|| format!("failed to publish page `{}`", args.page_id))?;
    print(format, "published", record)
}

pub async fn run_revert(args: PublishArgs, format: OutputFormat) -> anyhow::Result<()> {
    let conn = Connection::open(args.relay.base_url.as_deref())?;
    conn.ready().await?;
    let policy = conn.config.retry_policy();
    let record = with_retry(&policy, || conn.store.revert(&args.page_id))
        .await
        .with_context(|| format!("failed to revert page `{}`", args.page_id))?;
    print(format, "reverted", record)
}

fn print(format: OutputFormat, action: &'static str, record: PageRecord) -> anyhow::Result<()> {
    let result = ActionResult {
        action,
        id: record.id,
        version: record.draft.version,
        published: record.published.is_some(),
    };
    output::print_output(format, &result, format_human)?;
    Ok(())
}

fn format_human(result: &ActionResult) -> String {
    format!("{} {} (draft version {})", result.action, result.id, result.version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_line_names_action_and_version() {
        let result = ActionResult { action: "reverted", id: "p1".into(), version: 3, published: true };
        assert_eq!(format_human(&result), "reverted p1 (draft version 3)");
    }
}
