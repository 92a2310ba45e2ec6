// pagedraft-editor: one page's editing session against the page-record store.

pub mod cache;
pub mod config;
pub mod debounce;
pub mod draft;
pub mod error;
pub mod history;
pub mod readiness;
pub mod retry;
pub mod store;
pub mod tabs;

pub use draft::{ConflictRecord, DraftController, DraftSettings, DraftStatus, EditOrigin, SaveOutcome, SkipReason};
pub use error::{DraftError, StoreError};
pub use store::{HttpPageStore, MemoryPageStore, PageStore};
