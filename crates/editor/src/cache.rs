// Fire-and-forget persistence of the last published snapshot.
//
// Failures are logged and swallowed; nothing in the editing session
// depends on the cache succeeding.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use pagedraft_common::types::Document;

pub trait PublishedCache {
    fn remember(&self, page_id: &str, schema: &Document);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl PublishedCache for NoopCache {
    fn remember(&self, _page_id: &str, _schema: &Document) {}
}

/// Writes `<dir>/<page_id>.published.json`.
#[derive(Debug, Clone)]
pub struct FileSnapshotCache {
    dir: PathBuf,
}

impl FileSnapshotCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, page_id: &str) -> PathBuf {
        self.dir.join(format!("{}.published.json", file_stem(page_id)))
    }

    /// Read back a remembered snapshot.
    pub fn load(&self, page_id: &str) -> Option<Document> {
        let contents = std::fs::read(self.path_for(page_id)).ok()?;
        serde_json::from_slice(&contents).ok()
    }

    fn write(&self, path: &Path, schema: &Document) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let encoded = serde_json::to_vec_pretty(schema)?;
        std::fs::write(path, encoded)
    }
}

impl PublishedCache for FileSnapshotCache {
    fn remember(&self, page_id: &str, schema: &Document) {
        let path = self.path_for(page_id);
        match self.write(&path, schema) {
            Ok(()) => debug!(page_id, path = %path.display(), "cached published snapshot"),
            Err(error) => warn!(page_id, path = %path.display(), error = %error, "failed to cache published snapshot"),
        }
    }
}

// Page ids come from the store; keep them from escaping the cache dir.
fn file_stem(page_id: &str) -> String {
    page_id.chars().map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' }).collect()
}
