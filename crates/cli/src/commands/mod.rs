// CLI subcommand dispatch.

use std::io::{self, Read};
use std::path::Path;

use anyhow::Context;
use clap::{Args, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::output::OutputFormat;

pub mod apply;
pub mod check;
pub mod diff;
pub mod publish;
pub mod pull;
pub mod push;

#[derive(Subcommand)]
pub enum Command {
    /// Compute the patch that turns one document into another
    Diff(diff::DiffArgs),
    /// Apply a patch file to a document
    Apply(apply::ApplyArgs),
    /// Sanitize and validate a patch without applying it
    Check(check::CheckArgs),
    /// Fetch a page's draft from the relay
    Pull(pull::PullArgs),
    /// Replace a page's draft with a local document
    Push(push::PushArgs),
    /// Publish a page's current draft
    Publish(publish::PublishArgs),
    /// Reset a page's draft to its published snapshot
    Revert(publish::PublishArgs),
}

pub async fn run(cmd: Command, format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        Command::Diff(args) => diff::run(args, format),
        Command::Apply(args) => apply::run(args, format),
        Command::Check(args) => check::run(args, format),
        Command::Pull(args) => pull::run(args, format).await,
        Command::Push(args) => push::run(args, format).await,
        Command::Publish(args) => publish::run_publish(args, format).await,
        Command::Revert(args) => publish::run_revert(args, format).await,
    }
}

/// Options shared by every command that talks to a relay.
#[derive(Debug, Args)]
pub struct RelayArgs {
    /// Relay base URL (defaults to $PAGEDRAFT_BASE_URL, then ~/.pagedraft/config.toml).
    #[arg(long)]
    pub base_url: Option<String>,
}

/// Read and parse a JSON file. `-` reads stdin.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    };
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Write pretty JSON to `path`, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))
}
