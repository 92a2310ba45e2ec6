// Editor configuration at `~/.pagedraft/config.toml`.
//
// Every section is optional; missing keys fall back to defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use pagedraft_common::patch::validate::{DEFAULT_MAX_BYTES, DEFAULT_MAX_OPS};
use pagedraft_common::patch::PatchPolicy;

use crate::debounce::DebounceConfig;
use crate::history::DEFAULT_CAPACITY;
use crate::readiness::ReadinessPolicy;
use crate::retry::RetryPolicy;

/// Root directory for pagedraft state: `~/.pagedraft/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".pagedraft"))
}

/// Path to the config file: `~/.pagedraft/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    pub store: StoreConfig,
    pub autosave: AutosaveConfig,
    pub retry: RetryConfig,
    pub readiness: ReadinessConfig,
    pub history: HistoryConfig,
    pub patch: PatchConfig,
    pub cache: CacheConfig,
}

impl EditorConfig {
    /// Load from `~/.pagedraft/config.toml`. Returns defaults if the file
    /// doesn't exist or can't be parsed.
    pub fn load() -> Self {
        global_config_path().and_then(|p| Self::load_from(&p).ok()).unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.store.request_timeout_ms)
    }

    pub fn debounce(&self) -> DebounceConfig {
        DebounceConfig::with_millis(self.autosave.debounce_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts.max(1),
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_jitter: Duration::from_millis(self.retry.max_jitter_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    pub fn readiness_policy(&self) -> ReadinessPolicy {
        ReadinessPolicy {
            max_attempts: self.readiness.max_attempts.max(1),
            base_delay: Duration::from_millis(self.readiness.base_delay_ms),
            ..ReadinessPolicy::default()
        }
    }

    pub fn patch_policy(&self) -> PatchPolicy {
        PatchPolicy { max_ops: self.patch.max_ops, max_bytes: self.patch.max_bytes }
    }

    /// Directory for published snapshots; defaults to `~/.pagedraft/published`.
    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.cache.dir.clone().or_else(|| global_dir().map(|d| d.join("published")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Page-record service base URL.
    pub base_url: String,
    pub request_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { base_url: "http://127.0.0.1:8787".into(), request_timeout_ms: 10_000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Quiet period before an autosave fires (clamped to 250–10000).
    pub debounce_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self { debounce_ms: 1_500 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_jitter_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 500, max_jitter_ms: 250, max_delay_ms: 30_000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReadinessConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self { max_attempts: 5, base_delay_ms: 250 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: DEFAULT_CAPACITY }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PatchConfig {
    pub max_ops: usize,
    pub max_bytes: usize,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self { max_ops: DEFAULT_MAX_OPS, max_bytes: DEFAULT_MAX_BYTES }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Override for the published-snapshot directory.
    pub dir: Option<PathBuf>,
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "config I/O error: {e}"),
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Serialize(e) => write!(f, "config serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
