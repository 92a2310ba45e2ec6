// `pagedraft push`: replace a page's draft with a local document.
//
// Sends a whole-document write (`mode=schema`) with the caller's base
// version as the precondition. A stale base version is a conflict, never
// an overwrite.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use pagedraft_common::protocol::pages::WriteRequest;
use pagedraft_common::types::Document;
use pagedraft_editor::retry::with_retry;
use pagedraft_editor::PageStore;

use super::RelayArgs;
use crate::client::Connection;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct PushArgs {
    /// Page id.
    pub page_id: String,

    /// Document to upload (`-` for stdin).
    pub doc: PathBuf,

    /// Server version the document was edited from (see `pagedraft pull`).
    #[arg(long)]
    pub base_version: u64,

    #[command(flatten)]
    pub relay: RelayArgs,
}

#[derive(Debug, Serialize)]
pub struct PushResult {
    pub id: String,
    pub base_version: u64,
    pub version: u64,
}

pub async fn run(args: PushArgs, format: OutputFormat) -> anyhow::Result<()> {
    let schema: Document = super::read_json(&args.doc)?;
    let conn = Connection::open(args.relay.base_url.as_deref())?;
    conn.ready().await?;

    let request = WriteRequest::schema(schema, args.base_version);
    let policy = conn.config.retry_policy();
    let draft = with_retry(&policy, || conn.store.write(&args.page_id, &request))
        .await
        .with_context(|| format!("failed to push page `{}`", args.page_id))?;

    tracing::info!(page_id = %args.page_id, version = draft.version, "pushed draft");
    let result = PushResult { id: args.page_id, base_version: args.base_version, version: draft.version };
    output::print_output(format, &result, |r| format!("{}: version {} -> {}", r.id, r.base_version, r.version))?;
    Ok(())
}
