// Page-record store abstraction.
//
// The draft controller only talks to the store through `PageStore`, so the
// HTTP client and the in-memory store are interchangeable in tests.

pub mod http;
pub mod memory;

use pagedraft_common::protocol::pages::{CreatePageRequest, DraftState, PageMetaUpdate, PageRecord, WriteRequest};

use crate::error::StoreError;

pub use http::HttpPageStore;
pub use memory::MemoryPageStore;

pub trait PageStore {
    /// Lightweight liveness probe.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn create(&self, request: &CreatePageRequest) -> Result<PageRecord, StoreError>;

    async fn fetch(&self, page_id: &str) -> Result<PageRecord, StoreError>;

    /// Conditional draft write. Fails with `StoreError::Conflict` when
    /// `request.base_version` is stale.
    async fn write(&self, page_id: &str, request: &WriteRequest) -> Result<DraftState, StoreError>;

    async fn publish(&self, page_id: &str) -> Result<PageRecord, StoreError>;

    async fn revert(&self, page_id: &str) -> Result<PageRecord, StoreError>;

    async fn rename(&self, page_id: &str, update: &PageMetaUpdate) -> Result<PageRecord, StoreError>;

    async fn duplicate(&self, page_id: &str, update: &PageMetaUpdate) -> Result<PageRecord, StoreError>;
}
