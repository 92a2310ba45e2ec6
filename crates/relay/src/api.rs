// Page-record HTTP API.

use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Router,
};
use tracing::info;

use pagedraft_common::protocol::pages::{
    CreatePageRequest, PageMetaUpdate, PageRecord, WriteRequest, WriteResponse, HEALTH_PATH, PAGES_PATH,
};
use pagedraft_common::record::WriteRejection;

use crate::error::{ErrorCode, RelayError};
use crate::etag::IfMatchVersion;
use crate::state::{AppState, PageError};

const MAX_TITLE_CHARS: usize = 200;
const MAX_SLUG_CHARS: usize = 120;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(healthz))
        .route(PAGES_PATH, post(create_page))
        .route("/v1/pages/{id}", get(get_page).patch(rename_page).delete(delete_page))
        .route("/v1/pages/{id}/draft", patch(write_draft))
        .route("/v1/pages/{id}/publish", post(publish_page))
        .route("/v1/pages/{id}/revert", post(revert_page))
        .route("/v1/pages/{id}/duplicate", post(duplicate_page))
        .with_state(state)
}

async fn healthz(State(state): State<AppState>) -> Response {
    if state.is_warming_up() {
        return RelayError::from_code(ErrorCode::PreconditionTransient).into_response();
    }
    (StatusCode::OK, "ok").into_response()
}

async fn create_page(
    State(state): State<AppState>,
    payload: Result<Json<CreatePageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PageRecord>), RelayError> {
    let request = json_payload(payload)?;
    validate_title(&request.title)?;
    validate_slug(&request.slug)?;
    if let Some(schema) = &request.schema {
        if !schema.is_object() {
            return Err(RelayError::new(ErrorCode::ValidationFailed, "schema must be a JSON object"));
        }
    }

    let record = state.create(request).await;
    info!(page_id = %record.id, slug = %record.slug, "page created");
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_page(State(state): State<AppState>, Path(page_id): Path<String>) -> Result<Json<PageRecord>, RelayError> {
    Ok(Json(state.get(&page_id).await?))
}

async fn write_draft(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
    if_match: IfMatchVersion,
    payload: Result<Json<WriteRequest>, JsonRejection>,
) -> Result<Json<WriteResponse>, RelayError> {
    if state.is_warming_up() {
        return Err(RelayError::from_code(ErrorCode::PreconditionTransient));
    }
    let request = json_payload(payload)?;
    if_match.require_agreement(request.base_version)?;

    let draft = state.write(&page_id, &request).await?;
    info!(page_id = %page_id, mode = ?request.mode, version = draft.version, "draft written");
    Ok(Json(WriteResponse { draft }))
}

async fn publish_page(State(state): State<AppState>, Path(page_id): Path<String>) -> Result<Json<PageRecord>, RelayError> {
    let record = state.publish(&page_id).await?;
    info!(page_id = %page_id, version = record.draft.version, "page published");
    Ok(Json(record))
}

async fn revert_page(State(state): State<AppState>, Path(page_id): Path<String>) -> Result<Json<PageRecord>, RelayError> {
    let record = state.revert(&page_id).await?;
    info!(page_id = %page_id, version = record.draft.version, "draft reverted to published");
    Ok(Json(record))
}

async fn rename_page(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
    payload: Result<Json<PageMetaUpdate>, JsonRejection>,
) -> Result<Json<PageRecord>, RelayError> {
    let update = json_payload(payload)?;
    validate_update(&update)?;
    Ok(Json(state.rename(&page_id, &update).await?))
}

async fn duplicate_page(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
    payload: Result<Json<PageMetaUpdate>, JsonRejection>,
) -> Result<(StatusCode, Json<PageRecord>), RelayError> {
    let update = json_payload(payload)?;
    validate_update(&update)?;
    let copy = state.duplicate(&page_id, &update).await?;
    info!(page_id = %page_id, copy_id = %copy.id, "page duplicated");
    Ok((StatusCode::CREATED, Json(copy)))
}

async fn delete_page(State(state): State<AppState>, Path(page_id): Path<String>) -> Result<StatusCode, RelayError> {
    state.delete(&page_id).await?;
    info!(page_id = %page_id, "page deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ── Validation ─────────────────────────────────────────────────────

fn json_payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, RelayError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        RelayError::new(ErrorCode::ValidationFailed, rejection.body_text())
    })
}

fn validate_title(title: &str) -> Result<(), RelayError> {
    let trimmed = title.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(RelayError::new(
            ErrorCode::ValidationFailed,
            format!("title must be 1-{MAX_TITLE_CHARS} characters"),
        ));
    }
    Ok(())
}

fn validate_slug(slug: &str) -> Result<(), RelayError> {
    let valid = !slug.is_empty()
        && slug.len() <= MAX_SLUG_CHARS
        && slug.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !slug.starts_with('-')
        && !slug.ends_with('-');
    if !valid {
        return Err(RelayError::new(
            ErrorCode::ValidationFailed,
            "slug must be lowercase letters, digits and inner hyphens",
        ));
    }
    Ok(())
}

fn validate_update(update: &PageMetaUpdate) -> Result<(), RelayError> {
    if let Some(title) = update.title.as_deref() {
        validate_title(title)?;
    }
    if let Some(slug) = update.slug.as_deref() {
        validate_slug(slug)?;
    }
    Ok(())
}

impl From<PageError> for RelayError {
    fn from(error: PageError) -> Self {
        match error {
            PageError::NotFound => RelayError::new(ErrorCode::NotFound, "page not found"),
            PageError::Rejected(WriteRejection::Conflict { base_version, current_version }) => {
                RelayError::version_conflict(base_version, current_version)
            }
            PageError::Rejected(rejection) => RelayError::new(ErrorCode::ValidationFailed, rejection.to_string()),
        }
    }
}
