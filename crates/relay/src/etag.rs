// If-Match extraction for draft writes.
//
// Draft versions travel as quoted etags (`"7"`). The header is optional;
// when present it must name the same version as the body's `baseVersion`.

use axum::{
    extract::FromRequestParts,
    http::{header::IF_MATCH, request::Parts},
    response::{IntoResponse, Response},
};
use pagedraft_common::protocol::pages::parse_version_etag;

use crate::error::{ErrorCode, RelayError};

/// Version named by the `If-Match` header. `None` when the header is absent
/// or the wildcard `*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfMatchVersion(pub Option<u64>);

impl<S> FromRequestParts<S> for IfMatchVersion
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(IF_MATCH) else {
            return Ok(IfMatchVersion(None));
        };
        let raw = raw.to_str().map_err(|_| {
            RelayError::new(ErrorCode::ValidationFailed, "If-Match header is not valid utf-8").into_response()
        })?;
        parse_if_match(raw).map(IfMatchVersion).map_err(IntoResponse::into_response)
    }
}

impl IfMatchVersion {
    /// Reject a header that disagrees with `base_version`.
    pub fn require_agreement(&self, base_version: u64) -> Result<(), RelayError> {
        match self.0 {
            Some(version) if version != base_version => Err(RelayError::new(
                ErrorCode::ValidationFailed,
                format!("If-Match names version {version} but baseVersion is {base_version}"),
            )),
            _ => Ok(()),
        }
    }
}

fn parse_if_match(raw: &str) -> Result<Option<u64>, RelayError> {
    if raw.trim() == "*" {
        return Ok(None);
    }
    parse_version_etag(raw)
        .map(Some)
        .ok_or_else(|| RelayError::new(ErrorCode::ValidationFailed, "If-Match must be a quoted draft version"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
        routing::patch,
        Router,
    };
    use tower::ServiceExt;

    // ── parse_if_match ─────────────────────────────────────────────

    #[test]
    fn parses_quoted_and_weak_versions() {
        assert_eq!(parse_if_match("\"7\"").unwrap(), Some(7));
        assert_eq!(parse_if_match("W/\"12\"").unwrap(), Some(12));
        assert_eq!(parse_if_match(" 3 ").unwrap(), Some(3));
    }

    #[test]
    fn wildcard_means_no_precondition() {
        assert_eq!(parse_if_match("*").unwrap(), None);
    }

    #[test]
    fn rejects_non_numeric_etags() {
        assert_eq!(parse_if_match("\"abc\"").unwrap_err().code(), ErrorCode::ValidationFailed);
        assert!(parse_if_match("\"-1\"").is_err());
    }

    // ── require_agreement ──────────────────────────────────────────

    #[test]
    fn header_must_match_base_version() {
        assert!(IfMatchVersion(Some(4)).require_agreement(4).is_ok());
        assert!(IfMatchVersion(None).require_agreement(4).is_ok());
        assert!(IfMatchVersion(Some(3)).require_agreement(4).is_err());
    }

    // ── extractor ──────────────────────────────────────────────────

    async fn echo(IfMatchVersion(version): IfMatchVersion) -> String {
        format!("{version:?}")
    }

    fn app() -> Router {
        Router::new().route("/test", patch(echo))
    }

    async fn call(if_match: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().method(Method::PATCH).uri("/test");
        if let Some(value) = if_match {
            builder = builder.header("if-match", value);
        }
        let response = app().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn extractor_is_optional() {
        assert_eq!(call(None).await, (StatusCode::OK, "None".to_owned()));
    }

    #[tokio::test]
    async fn extractor_reads_version() {
        assert_eq!(call(Some("\"9\"")).await, (StatusCode::OK, "Some(9)".to_owned()));
    }

    #[tokio::test]
    async fn extractor_rejects_garbage_with_envelope() {
        let (status, body) = call(Some("\"v9\"")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("VALIDATION_FAILED"));
    }
}
