// Versioned draft controller.
//
// Owns one page's editing session: the working copy (through the undo
// history), the last-saved baseline and its version, the autosave timer and
// any pending conflict. Every write carries the last-known version; the
// store rejects stale writes and the controller surfaces both sides instead
// of overwriting either.

pub mod conflict;

use std::fmt;

use chrono::Utc;
use tracing::{debug, info, warn};

use pagedraft_common::diff::{diff, differs};
use pagedraft_common::patch::{apply_patch, apply_patch_with_report, sanitize, validate, PatchPolicy, SkippedOp};
use pagedraft_common::protocol::pages::{DraftState, PageMetaUpdate, PageRecord, WriteRequest};
use pagedraft_common::types::{Document, PatchOp};

use crate::cache::{NoopCache, PublishedCache};
use crate::config::EditorConfig;
use crate::debounce::{AutosaveTimer, DebounceConfig};
use crate::error::{DraftError, StoreError};
use crate::history::{UndoHistory, DEFAULT_CAPACITY};
use crate::readiness::{wait_until_ready, Readiness, ReadinessPolicy};
use crate::retry::{with_retry, RetryPolicy};
use crate::store::PageStore;
use crate::tabs::{TabBus, TabCoordinator};

pub use conflict::ConflictRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftSettings {
    pub retry: RetryPolicy,
    pub readiness: ReadinessPolicy,
    pub debounce: DebounceConfig,
    pub patch_policy: PatchPolicy,
    pub history_capacity: usize,
}

impl Default for DraftSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            readiness: ReadinessPolicy::default(),
            debounce: DebounceConfig::default(),
            patch_policy: PatchPolicy::default(),
            history_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl From<&EditorConfig> for DraftSettings {
    fn from(config: &EditorConfig) -> Self {
        Self {
            retry: config.retry_policy(),
            readiness: config.readiness_policy(),
            debounce: config.debounce(),
            patch_policy: config.patch_policy(),
            history_capacity: config.history.capacity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftStatus {
    Loading,
    /// Loaded and past the readiness gate; nothing edited yet.
    Ready,
    Clean,
    Dirty,
    Saving,
    Conflict,
    Published,
    /// The server record is gone. Terminal.
    Deleted,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Clean => "clean",
            Self::Dirty => "dirty",
            Self::Saving => "saving",
            Self::Conflict => "conflict",
            Self::Published => "published",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who produced an edit. Both go through the same pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOrigin {
    User,
    Agent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotDue,
    Offline,
    /// Last save exhausted its retries; this cycle only re-probed the store.
    GateClosed,
    /// Conflict pending or record deleted.
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { version: u64 },
    /// Nothing to send.
    Unchanged,
    Skipped(SkipReason),
}

pub struct DraftController<S: PageStore> {
    store: S,
    page_id: String,
    settings: DraftSettings,
    status: DraftStatus,
    history: UndoHistory,
    saved: Document,
    version: u64,
    published: Option<Document>,
    title: String,
    slug: String,
    conflict: Option<ConflictRecord>,
    autosave: AutosaveTimer,
    online: bool,
    gate_open: bool,
    cache: Box<dyn PublishedCache>,
    tabs: Option<TabCoordinator>,
}

impl<S: PageStore> DraftController<S> {
    /// A controller in `Loading` state. Call [`load`](Self::load) before editing.
    pub fn new(store: S, page_id: impl Into<String>, settings: DraftSettings) -> Self {
        Self {
            store,
            page_id: page_id.into(),
            settings,
            status: DraftStatus::Loading,
            history: UndoHistory::new(Document::Null, settings.history_capacity),
            saved: Document::Null,
            version: 0,
            published: None,
            title: String::new(),
            slug: String::new(),
            conflict: None,
            autosave: AutosaveTimer::new(settings.debounce),
            online: true,
            gate_open: false,
            cache: Box::new(NoopCache),
            tabs: None,
        }
    }

    /// `new` followed by `load`.
    pub async fn open(store: S, page_id: impl Into<String>, settings: DraftSettings) -> Result<Self, DraftError> {
        let mut controller = Self::new(store, page_id, settings);
        controller.load().await?;
        Ok(controller)
    }

    pub fn with_cache(mut self, cache: impl PublishedCache + 'static) -> Self {
        self.cache = Box::new(cache);
        self
    }

    /// Join the tab bus for this page.
    pub fn attach_tabs(&mut self, bus: &TabBus) {
        self.attach_coordinator(TabCoordinator::new(bus, &self.page_id));
    }

    /// Join with a coordinator built by the caller (e.g. one with a hook).
    pub fn attach_coordinator(&mut self, mut coordinator: TabCoordinator) {
        coordinator.observe(self.version);
        self.tabs = Some(coordinator);
    }

    /// Wait for the store, then fetch the page.
    pub async fn load(&mut self) -> Result<(), DraftError> {
        match wait_until_ready(&self.store, &self.settings.readiness).await {
            Readiness::Fatal(error) => return Err(DraftError::NotReady(error)),
            Readiness::Ready | Readiness::GaveUp => {}
        }
        self.gate_open = true;

        let record = match self.fetch_latest().await {
            Ok(record) => record,
            Err(error) => return Err(self.fail(error)),
        };

        self.history.reset(record.draft.schema.clone());
        self.saved = record.draft.schema;
        self.version = record.draft.version;
        self.published = record.published.map(|p| p.schema);
        self.title = record.title;
        self.slug = record.slug;
        self.status = DraftStatus::Ready;
        if let Some(tabs) = self.tabs.as_mut() {
            tabs.observe(self.version);
        }
        info!(page_id = %self.page_id, version = self.version, "draft loaded");
        Ok(())
    }

    // ── Accessors ──────────────────────────────────────────────────

    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    pub fn status(&self) -> DraftStatus {
        self.status
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn current(&self) -> &Document {
        self.history.current()
    }

    pub fn saved(&self) -> &Document {
        &self.saved
    }

    pub fn published(&self) -> Option<&Document> {
        self.published.as_ref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn conflict(&self) -> Option<&ConflictRecord> {
        self.conflict.as_ref()
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_dirty(&self) -> bool {
        differs(&self.saved, self.history.current())
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn autosave_pending(&self) -> bool {
        self.autosave.is_pending()
    }

    pub fn autosave_deadline(&self) -> Option<tokio::time::Instant> {
        self.autosave.deadline()
    }

    // ── Editing ────────────────────────────────────────────────────

    /// Sanitize, validate and apply `ops` to the working copy.
    ///
    /// A patch that fails validation is rejected whole and the document is
    /// untouched. Ops the applier cannot place are skipped and returned.
    pub fn apply_edit(&mut self, ops: &[PatchOp], origin: EditOrigin) -> Result<Vec<SkippedOp>, DraftError> {
        self.ensure_editable()?;

        let ops = sanitize(ops);
        let report = validate(&ops, &self.settings.patch_policy);
        if !report.valid {
            warn!(page_id = %self.page_id, ?origin, errors = report.errors.len(), "rejected patch");
            return Err(DraftError::Validation(report));
        }

        let outcome = apply_patch_with_report(self.history.current(), &ops);
        let changed = self.history.record(outcome.document);
        debug!(
            page_id = %self.page_id,
            ?origin,
            ops = ops.len(),
            skipped = outcome.skipped.len(),
            changed,
            "applied edit"
        );
        if changed {
            self.after_local_change();
        }
        Ok(outcome.skipped)
    }

    pub fn undo(&mut self) -> Result<bool, DraftError> {
        self.ensure_editable()?;
        let moved = self.history.undo();
        if moved {
            self.after_local_change();
        }
        Ok(moved)
    }

    pub fn redo(&mut self) -> Result<bool, DraftError> {
        self.ensure_editable()?;
        let moved = self.history.redo();
        if moved {
            self.after_local_change();
        }
        Ok(moved)
    }

    /// Replace the draft with the published document as an undoable step.
    pub fn revert(&mut self) -> Result<(), DraftError> {
        self.ensure_editable()?;
        let Some(published) = self.published.clone() else {
            return Err(DraftError::NothingPublished);
        };
        if self.history.record(published) {
            info!(page_id = %self.page_id, "reverted draft to published version");
            self.after_local_change();
        }
        Ok(())
    }

    // ── Saving ─────────────────────────────────────────────────────

    /// Sleep until the autosave deadline, then run the autosave cycle.
    /// Returns `Skipped(NotDue)` immediately when no save is scheduled.
    pub async fn run_pending_autosave(&mut self) -> Result<SaveOutcome, DraftError> {
        let Some(deadline) = self.autosave.deadline() else {
            return Ok(SaveOutcome::Skipped(SkipReason::NotDue));
        };
        tokio::time::sleep_until(deadline).await;
        self.autosave_tick().await
    }

    /// One autosave cycle. Offline, blocked and gate-closed cycles skip
    /// without surfacing an error.
    pub async fn autosave_tick(&mut self) -> Result<SaveOutcome, DraftError> {
        if !self.autosave.take_due() {
            return Ok(SaveOutcome::Skipped(SkipReason::NotDue));
        }
        if !self.online {
            debug!(page_id = %self.page_id, "offline, skipping autosave");
            return Ok(SaveOutcome::Skipped(SkipReason::Offline));
        }
        if self.conflict.is_some() || self.status == DraftStatus::Deleted {
            return Ok(SaveOutcome::Skipped(SkipReason::Blocked));
        }
        if !self.gate_open {
            let readiness = wait_until_ready(&self.store, &ReadinessPolicy::single_probe()).await;
            if readiness.is_ready() {
                debug!(page_id = %self.page_id, "store answered again, reopening autosave");
                self.gate_open = true;
            }
            self.autosave.schedule();
            return Ok(SaveOutcome::Skipped(SkipReason::GateClosed));
        }
        self.save().await
    }

    /// Save immediately, ahead of the timer.
    pub async fn save_now(&mut self) -> Result<SaveOutcome, DraftError> {
        self.autosave.cancel();
        match self.status {
            DraftStatus::Loading => return Err(DraftError::Loading),
            DraftStatus::Deleted => return Err(DraftError::Deleted),
            _ => {}
        }
        if self.conflict.is_some() {
            return Err(DraftError::ConflictPending);
        }
        self.save().await
    }

    async fn save(&mut self) -> Result<SaveOutcome, DraftError> {
        let sent = self.history.current().clone();
        let ops = diff(&self.saved, &sent);
        if ops.is_empty() {
            self.refresh_status();
            return Ok(SaveOutcome::Unchanged);
        }

        let previous_status = self.status;
        self.status = DraftStatus::Saving;
        debug!(page_id = %self.page_id, base_version = self.version, ops = ops.len(), "saving draft");

        let request = WriteRequest::patches(ops, self.version);
        let result = {
            let store = &self.store;
            let page_id = self.page_id.as_str();
            with_retry(&self.settings.retry, || store.write(page_id, &request)).await
        };

        match result {
            Ok(draft) => {
                let version = draft.version;
                self.adopt_saved(draft, &sent);
                info!(page_id = %self.page_id, version, "draft saved");
                Ok(SaveOutcome::Saved { version })
            }
            Err(StoreError::Conflict { current_version }) => {
                info!(page_id = %self.page_id, local_version = self.version, current_version, "save rejected as stale");
                Err(self.enter_conflict().await)
            }
            Err(error) if error.is_transient() => {
                warn!(page_id = %self.page_id, error = %error, "save failed after retries, closing autosave gate");
                self.gate_open = false;
                self.status = previous_status;
                self.refresh_status();
                self.autosave.schedule();
                Err(DraftError::Transient(error))
            }
            Err(error) => {
                self.status = previous_status;
                self.refresh_status();
                Err(self.fail(error))
            }
        }
    }

    /// Install a successful write. The returned schema becomes the saved
    /// baseline; edits made after `sent` are re-applied on top of it.
    fn adopt_saved(&mut self, draft: DraftState, sent: &Document) {
        let pending = diff(sent, self.history.current());
        let working = apply_patch(&draft.schema, &pending);
        self.saved = draft.schema;
        self.version = draft.version;
        self.history.rebase(working);
        self.announce_version();
        self.refresh_status();
        if self.status == DraftStatus::Dirty {
            self.autosave.schedule();
        }
    }

    // ── Conflicts ──────────────────────────────────────────────────

    /// Fetch the server draft and hold both sides for confirmation.
    async fn enter_conflict(&mut self) -> DraftError {
        match self.fetch_latest().await {
            Ok(record) => self.open_conflict(record),
            Err(error) => {
                self.refresh_status();
                self.fail(error)
            }
        }
    }

    fn open_conflict(&mut self, record: PageRecord) -> DraftError {
        let local_version = self.version;
        let current_version = record.draft.version;
        self.conflict = Some(ConflictRecord {
            old: self.saved.clone(),
            new: record.draft.schema,
            local: self.history.current().clone(),
            local_version,
            current_version,
            detected_at: Utc::now(),
        });
        self.published = record.published.map(|p| p.schema);
        self.status = DraftStatus::Conflict;
        self.autosave.cancel();
        info!(page_id = %self.page_id, local_version, current_version, "draft conflict awaiting confirmation");
        DraftError::Conflict { local_version, current_version }
    }

    /// Accept the server document and version. The local copy stays one
    /// undo step away. Returns `false` when no conflict was pending.
    pub fn confirm_conflict(&mut self) -> bool {
        let Some(conflict) = self.conflict.take() else {
            return false;
        };
        self.history.record(conflict.new.clone());
        self.saved = conflict.new;
        self.version = conflict.current_version;
        self.autosave.cancel();
        self.refresh_status();
        self.acknowledge_tabs(conflict.current_version);
        self.announce_version();
        info!(page_id = %self.page_id, version = self.version, "adopted server draft");
        true
    }

    /// Drop the conflict and keep editing the local copy. The next save
    /// will be stale again unless the caller reconciles first.
    pub fn cancel_conflict(&mut self) -> bool {
        let Some(conflict) = self.conflict.take() else {
            return false;
        };
        self.autosave.cancel();
        self.acknowledge_tabs(conflict.current_version);
        self.refresh_status();
        info!(page_id = %self.page_id, "kept local draft over server version");
        true
    }

    /// Fetch the server record and enter the conflict flow if it is ahead of
    /// the local version. Returns whether a conflict was opened.
    pub async fn reconcile_remote(&mut self) -> Result<bool, DraftError> {
        match self.status {
            DraftStatus::Loading => return Err(DraftError::Loading),
            DraftStatus::Deleted => return Err(DraftError::Deleted),
            _ => {}
        }
        if self.conflict.is_some() {
            return Ok(false);
        }
        let record = match self.fetch_latest().await {
            Ok(record) => record,
            Err(error) => return Err(self.fail(error)),
        };
        if record.draft.version <= self.version {
            return Ok(false);
        }
        self.open_conflict(record);
        Ok(true)
    }

    /// Check the tab bus; reconcile if another tab saved a newer version.
    pub async fn poll_tabs(&mut self) -> Result<bool, DraftError> {
        let Some(tabs) = self.tabs.as_mut() else {
            return Ok(false);
        };
        if tabs.poll().is_none() {
            return Ok(false);
        }
        self.reconcile_remote().await
    }

    // ── Actions ────────────────────────────────────────────────────

    /// Save pending edits, then publish the draft.
    pub async fn publish(&mut self) -> Result<(), DraftError> {
        self.ensure_editable()?;
        if self.is_dirty() {
            self.save_now().await?;
        }

        let result = {
            let store = &self.store;
            let page_id = self.page_id.as_str();
            with_retry(&self.settings.retry, || store.publish(page_id)).await
        };
        let record = result.map_err(|error| self.fail(error))?;

        let snapshot = match &record.published {
            Some(published) => published.schema.clone(),
            None => record.draft.schema.clone(),
        };
        self.cache.remember(&self.page_id, &snapshot);
        self.title = record.title.clone();
        self.slug = record.slug.clone();

        // The server published a draft this session never saw.
        if record.draft.version > self.version {
            warn!(
                page_id = %self.page_id,
                local_version = self.version,
                current_version = record.draft.version,
                "published a newer server draft"
            );
            return Err(self.open_conflict(record));
        }

        self.published = Some(snapshot);
        self.history.publish();
        self.status = DraftStatus::Published;
        info!(page_id = %self.page_id, version = self.version, "draft published");
        Ok(())
    }

    pub async fn rename(&mut self, update: &PageMetaUpdate) -> Result<(), DraftError> {
        self.ensure_loaded()?;
        let result = {
            let store = &self.store;
            let page_id = self.page_id.as_str();
            with_retry(&self.settings.retry, || store.rename(page_id, update)).await
        };
        let record = result.map_err(|error| self.fail(error))?;
        self.title = record.title;
        self.slug = record.slug;
        info!(page_id = %self.page_id, title = %self.title, slug = %self.slug, "page renamed");
        Ok(())
    }

    /// Copy the page on the server. The session keeps editing the original.
    pub async fn duplicate(&mut self, update: &PageMetaUpdate) -> Result<PageRecord, DraftError> {
        self.ensure_loaded()?;
        let result = {
            let store = &self.store;
            let page_id = self.page_id.as_str();
            with_retry(&self.settings.retry, || store.duplicate(page_id, update)).await
        };
        let copy = result.map_err(|error| self.fail(error))?;
        info!(page_id = %self.page_id, copy_id = %copy.id, "page duplicated");
        Ok(copy)
    }

    pub fn set_online(&mut self, online: bool) {
        if self.online == online {
            return;
        }
        self.online = online;
        debug!(page_id = %self.page_id, online, "connectivity changed");
        if online && self.conflict.is_none() && self.is_dirty() {
            self.autosave.schedule();
        }
    }

    // ── Internals ──────────────────────────────────────────────────

    async fn fetch_latest(&self) -> Result<PageRecord, StoreError> {
        let store = &self.store;
        let page_id = self.page_id.as_str();
        with_retry(&self.settings.retry, || store.fetch(page_id)).await
    }

    fn ensure_loaded(&self) -> Result<(), DraftError> {
        match self.status {
            DraftStatus::Loading => Err(DraftError::Loading),
            DraftStatus::Deleted => Err(DraftError::Deleted),
            _ => Ok(()),
        }
    }

    fn ensure_editable(&self) -> Result<(), DraftError> {
        self.ensure_loaded()?;
        if self.conflict.is_some() {
            return Err(DraftError::ConflictPending);
        }
        Ok(())
    }

    fn after_local_change(&mut self) {
        self.refresh_status();
        if self.status == DraftStatus::Dirty {
            self.autosave.schedule();
        } else {
            self.autosave.cancel();
        }
    }

    /// Clean or Dirty by diff, unless a terminal or held state applies.
    fn refresh_status(&mut self) {
        if matches!(self.status, DraftStatus::Loading | DraftStatus::Deleted) || self.conflict.is_some() {
            return;
        }
        self.status = if self.is_dirty() { DraftStatus::Dirty } else { DraftStatus::Clean };
    }

    fn fail(&mut self, error: StoreError) -> DraftError {
        let error = DraftError::from_store(error);
        if error == DraftError::Deleted {
            warn!(page_id = %self.page_id, "page no longer exists on the server");
            self.status = DraftStatus::Deleted;
            self.conflict = None;
            self.autosave.cancel();
        }
        error
    }

    /// Versions seen while a conflict was open stay reportable afterwards.
    fn acknowledge_tabs(&mut self, version: u64) {
        if let Some(tabs) = self.tabs.as_mut() {
            tabs.acknowledge(version);
        }
    }

    fn announce_version(&mut self) {
        if let Some(tabs) = self.tabs.as_mut() {
            tabs.announce(self.version);
        }
    }
}
