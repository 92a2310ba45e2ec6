// Store connection for commands that talk to a relay.

use anyhow::Context;

use pagedraft_editor::config::EditorConfig;
use pagedraft_editor::readiness::{wait_until_ready, Readiness};
use pagedraft_editor::HttpPageStore;

/// Overrides `[store] base_url` without touching the config file.
pub const BASE_URL_ENV: &str = "PAGEDRAFT_BASE_URL";

/// Connection settings shared by relay commands.
pub struct Connection {
    pub store: HttpPageStore,
    pub config: EditorConfig,
}

impl Connection {
    pub fn open(base_url: Option<&str>) -> anyhow::Result<Self> {
        Self::open_with(EditorConfig::load(), base_url, |key| std::env::var(key).ok())
    }

    fn open_with<F>(config: EditorConfig, base_url: Option<&str>, env: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = resolve_base_url(&config, base_url, env);
        let store = HttpPageStore::new(&base_url, config.request_timeout())
            .with_context(|| format!("invalid relay url `{base_url}`"))?;
        Ok(Self { store, config })
    }

    /// Wait for the relay before issuing a write. A relay that keeps failing
    /// transiently is still attempted; the retry policy owns that case.
    pub async fn ready(&self) -> anyhow::Result<()> {
        match wait_until_ready(&self.store, &self.config.readiness_policy()).await {
            Readiness::Ready => Ok(()),
            Readiness::GaveUp => {
                tracing::warn!(base_url = self.store.base_url(), "relay still not ready, proceeding");
                Ok(())
            }
            Readiness::Fatal(err) => {
                Err(anyhow::Error::new(err).context(format!("relay at {} is not usable", self.store.base_url())))
            }
        }
    }
}

fn resolve_base_url<F>(config: &EditorConfig, flag: Option<&str>, env: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    flag.map(str::to_owned)
        .or_else(|| env(BASE_URL_ENV).filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| config.store.base_url.clone())
}
