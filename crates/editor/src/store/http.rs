// HTTP client for the page-record service.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{IF_MATCH, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use pagedraft_common::protocol::pages::{
    version_etag, CreatePageRequest, DraftState, PageMetaUpdate, PageRecord, WriteRequest, WriteResponse,
    HEALTH_PATH, PAGES_PATH,
};

use super::PageStore;
use crate::error::StoreError;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid store url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("unsupported store url scheme: {0}")]
    UnsupportedScheme(String),
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct HttpPageStore {
    client: Client,
    base: Url,
}

impl HttpPageStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BuildError> {
        let parsed = Url::parse(base_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BuildError::UnsupportedScheme(parsed.scheme().to_owned()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base: parsed })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    /// `route` below the base path, then `tail` as percent-encoded segments.
    fn endpoint(&self, route: &str, tail: &[&str]) -> Url {
        let mut url = self.base.clone();
        // http(s) urls always have a hierarchical path.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(route.split('/').filter(|segment| !segment.is_empty()));
            path.extend(tail);
        }
        url
    }

    fn page_url(&self, page_id: &str, action: Option<&str>) -> Url {
        match action {
            Some(action) => self.endpoint(PAGES_PATH, &[page_id, action]),
            None => self.endpoint(PAGES_PATH, &[page_id]),
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request.send().await.map_err(send_error)?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(error_from_response(response).await)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StoreError> {
        let response = self.send(request).await?;
        response.json::<T>().await.map_err(|e| StoreError::Decode(e.to_string()))
    }
}

impl PageStore for HttpPageStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.send(self.client.get(self.endpoint(HEALTH_PATH, &[]))).await.map(|_| ())
    }

    async fn create(&self, request: &CreatePageRequest) -> Result<PageRecord, StoreError> {
        self.send_json(self.client.post(self.endpoint(PAGES_PATH, &[])).json(request)).await
    }

    async fn fetch(&self, page_id: &str) -> Result<PageRecord, StoreError> {
        self.send_json(self.client.get(self.page_url(page_id, None))).await
    }

    async fn write(&self, page_id: &str, request: &WriteRequest) -> Result<DraftState, StoreError> {
        debug!(page_id, base_version = request.base_version, mode = ?request.mode, "writing draft");
        let builder = self
            .client
            .patch(self.page_url(page_id, Some("draft")))
            .header(IF_MATCH, version_etag(request.base_version))
            .json(request);
        let response: WriteResponse = self.send_json(builder).await?;
        Ok(response.draft)
    }

    async fn publish(&self, page_id: &str) -> Result<PageRecord, StoreError> {
        self.send_json(self.client.post(self.page_url(page_id, Some("publish")))).await
    }

    async fn revert(&self, page_id: &str) -> Result<PageRecord, StoreError> {
        self.send_json(self.client.post(self.page_url(page_id, Some("revert")))).await
    }

    async fn rename(&self, page_id: &str, update: &PageMetaUpdate) -> Result<PageRecord, StoreError> {
        self.send_json(self.client.patch(self.page_url(page_id, None)).json(update)).await
    }

    async fn duplicate(&self, page_id: &str, update: &PageMetaUpdate) -> Result<PageRecord, StoreError> {
        self.send_json(self.client.post(self.page_url(page_id, Some("duplicate"))).json(update)).await
    }
}

// ── Error mapping ──────────────────────────────────────────────────

fn send_error(error: reqwest::Error) -> StoreError {
    if error.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::Network(error.to_string())
    }
}

async fn error_from_response(response: Response) -> StoreError {
    let status = response.status();
    let retry_after =
        response.headers().get(RETRY_AFTER).and_then(|value| value.to_str().ok()).map(str::to_owned);
    let body = response.text().await.unwrap_or_default();
    error_from_parts(status, retry_after.as_deref(), &body, Utc::now())
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorBody>,
    #[serde(default, rename = "currentVersion")]
    current_version: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<Value>,
}

impl ErrorEnvelope {
    fn current_version(&self) -> Option<u64> {
        self.current_version.or_else(|| {
            self.error.as_ref()?.details.as_ref()?.get("currentVersion")?.as_u64()
        })
    }

    fn message(&self) -> Option<&str> {
        self.error.as_ref()?.message.as_deref()
    }
}

fn error_from_parts(status: StatusCode, retry_after: Option<&str>, body: &str, now: DateTime<Utc>) -> StoreError {
    let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();

    if status == StatusCode::NOT_FOUND {
        return StoreError::NotFound;
    }
    if status == StatusCode::CONFLICT {
        if let Some(current_version) = envelope.current_version() {
            return StoreError::Conflict { current_version };
        }
    }

    let message = match envelope.message() {
        Some(message) => message.to_owned(),
        None if body.trim().is_empty() => status.canonical_reason().unwrap_or("request failed").to_owned(),
        None => body.trim().to_owned(),
    };
    StoreError::Http {
        status: status.as_u16(),
        message,
        retry_after: retry_after.and_then(|raw| crate::retry::parse_retry_after(raw, now)),
    }
}
