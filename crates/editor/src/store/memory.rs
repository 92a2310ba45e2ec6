// In-memory page store.
//
// Shares the relay's write semantics. Clones share state, so a test can
// hold one handle for the controller and another to play a second editor.
// Failures queued with `fail_next` are returned before the real call runs.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

use pagedraft_common::protocol::pages::{CreatePageRequest, DraftState, PageMetaUpdate, PageRecord, WriteRequest};
use pagedraft_common::record::WriteRejection;
use pagedraft_common::types::empty_page;

use super::PageStore;
use crate::error::StoreError;

#[derive(Debug, Default)]
struct MemoryState {
    pages: HashMap<String, PageRecord>,
    failures: VecDeque<StoreError>,
    calls: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryPageStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(record: PageRecord) -> Self {
        let store = Self::new();
        store.insert(record);
        store
    }

    pub fn insert(&self, record: PageRecord) {
        self.lock().pages.insert(record.id.clone(), record);
    }

    pub fn page(&self, page_id: &str) -> Option<PageRecord> {
        self.lock().pages.get(page_id).cloned()
    }

    pub fn remove(&self, page_id: &str) -> Option<PageRecord> {
        self.lock().pages.remove(page_id)
    }

    /// Queue a failure for the next store call.
    pub fn fail_next(&self, error: StoreError) {
        self.lock().failures.push_back(error);
    }

    /// Number of store calls made so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory page store lock should not be poisoned")
    }

    /// Count the call, pop an injected failure, then run `f` on the state.
    fn call<T>(&self, f: impl FnOnce(&mut MemoryState) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let mut state = self.lock();
        state.calls += 1;
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }
        f(&mut state)
    }
}

fn page_mut<'a>(state: &'a mut MemoryState, page_id: &str) -> Result<&'a mut PageRecord, StoreError> {
    state.pages.get_mut(page_id).ok_or(StoreError::NotFound)
}

fn rejection(error: WriteRejection) -> StoreError {
    match error {
        WriteRejection::Conflict { current_version, .. } => StoreError::Conflict { current_version },
        other => StoreError::http(400, other.to_string()),
    }
}

impl PageStore for MemoryPageStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.call(|_| Ok(()))
    }

    async fn create(&self, request: &CreatePageRequest) -> Result<PageRecord, StoreError> {
        self.call(|state| {
            let schema = request.schema.clone().unwrap_or_else(empty_page);
            let record = PageRecord::new(Uuid::new_v4().to_string(), &request.title, &request.slug, schema);
            state.pages.insert(record.id.clone(), record.clone());
            Ok(record)
        })
    }

    async fn fetch(&self, page_id: &str) -> Result<PageRecord, StoreError> {
        self.call(|state| page_mut(state, page_id).map(|record| record.clone()))
    }

    async fn write(&self, page_id: &str, request: &WriteRequest) -> Result<DraftState, StoreError> {
        self.call(|state| {
            let record = page_mut(state, page_id)?;
            record.write(request).cloned().map_err(rejection)
        })
    }

    async fn publish(&self, page_id: &str) -> Result<PageRecord, StoreError> {
        self.call(|state| {
            let record = page_mut(state, page_id)?;
            record.publish();
            Ok(record.clone())
        })
    }

    async fn revert(&self, page_id: &str) -> Result<PageRecord, StoreError> {
        self.call(|state| {
            let record = page_mut(state, page_id)?;
            record.revert().map_err(rejection)?;
            Ok(record.clone())
        })
    }

    async fn rename(&self, page_id: &str, update: &PageMetaUpdate) -> Result<PageRecord, StoreError> {
        self.call(|state| {
            let record = page_mut(state, page_id)?;
            record.rename(update);
            Ok(record.clone())
        })
    }

    async fn duplicate(&self, page_id: &str, update: &PageMetaUpdate) -> Result<PageRecord, StoreError> {
        self.call(|state| {
            let copy = page_mut(state, page_id)?.duplicate(Uuid::new_v4().to_string(), update);
            state.pages.insert(copy.id.clone(), copy.clone());
            Ok(copy)
        })
    }
}
