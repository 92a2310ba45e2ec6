// Shared relay state: the page table and the warm-up clock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use pagedraft_common::protocol::pages::{CreatePageRequest, DraftState, PageMetaUpdate, PageRecord, WriteRequest};
use pagedraft_common::record::WriteRejection;
use pagedraft_common::types::empty_page;

#[derive(Debug, Clone, PartialEq)]
pub enum PageError {
    NotFound,
    Rejected(WriteRejection),
}

impl From<WriteRejection> for PageError {
    fn from(rejection: WriteRejection) -> Self {
        Self::Rejected(rejection)
    }
}

#[derive(Clone)]
pub struct AppState {
    pages: Arc<RwLock<HashMap<String, PageRecord>>>,
    warm_at: Instant,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_warmup(Duration::ZERO)
    }

    /// Writes answer "transient" until `warmup` has elapsed.
    pub fn with_warmup(warmup: Duration) -> Self {
        Self { pages: Arc::new(RwLock::new(HashMap::new())), warm_at: Instant::now() + warmup }
    }

    pub fn is_warming_up(&self) -> bool {
        Instant::now() < self.warm_at
    }

    pub async fn insert(&self, record: PageRecord) {
        self.pages.write().await.insert(record.id.clone(), record);
    }

    pub async fn create(&self, request: CreatePageRequest) -> PageRecord {
        let schema = request.schema.unwrap_or_else(empty_page);
        let record = PageRecord::new(Uuid::new_v4().to_string(), request.title, request.slug, schema);
        self.insert(record.clone()).await;
        record
    }

    pub async fn get(&self, page_id: &str) -> Result<PageRecord, PageError> {
        self.pages.read().await.get(page_id).cloned().ok_or(PageError::NotFound)
    }

    pub async fn write(&self, page_id: &str, request: &WriteRequest) -> Result<DraftState, PageError> {
        let mut pages = self.pages.write().await;
        let record = pages.get_mut(page_id).ok_or(PageError::NotFound)?;
        Ok(record.write(request)?.clone())
    }

    pub async fn publish(&self, page_id: &str) -> Result<PageRecord, PageError> {
        self.update(page_id, |record| {
            record.publish();
            Ok(())
        })
        .await
    }

    pub async fn revert(&self, page_id: &str) -> Result<PageRecord, PageError> {
        self.update(page_id, |record| Ok(record.revert()?)).await
    }

    pub async fn rename(&self, page_id: &str, update: &PageMetaUpdate) -> Result<PageRecord, PageError> {
        self.update(page_id, |record| {
            record.rename(update);
            Ok(())
        })
        .await
    }

    pub async fn duplicate(&self, page_id: &str, update: &PageMetaUpdate) -> Result<PageRecord, PageError> {
        let mut pages = self.pages.write().await;
        let copy = pages.get(page_id).ok_or(PageError::NotFound)?.duplicate(Uuid::new_v4().to_string(), update);
        pages.insert(copy.id.clone(), copy.clone());
        Ok(copy)
    }

    pub async fn delete(&self, page_id: &str) -> Result<(), PageError> {
        self.pages.write().await.remove(page_id).map(|_| ()).ok_or(PageError::NotFound)
    }

    async fn update<F>(&self, page_id: &str, f: F) -> Result<PageRecord, PageError>
    where
        F: FnOnce(&mut PageRecord) -> Result<(), PageError>,
    {
        let mut pages = self.pages.write().await;
        let record = pages.get_mut(page_id).ok_or(PageError::NotFound)?;
        f(record)?;
        Ok(record.clone())
    }
}
