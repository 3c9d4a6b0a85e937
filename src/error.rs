//! Structured error taxonomy surfaced across the HTTP boundary.
//!
//! Mirrors the teacher's split between `anyhow` for internal plumbing and a
//! `thiserror` enum for anything an external caller needs to reason about
//! (compare `search::errors::SearchError`).

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::ssrf::BlockReason;

/// Error kinds an HTTP caller can observe, one-to-one with spec §7.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid url")]
    InvalidUrl(Option<String>),

    #[error("unsupported protocol")]
    UnsupportedProtocol(Option<String>),

    #[error("blocked: localhost")]
    BlockedLocalhost(Option<String>),

    #[error("blocked: private ip")]
    BlockedPrivateIp(Option<String>),

    #[error("blocked: private hostname")]
    BlockedPrivateHostname(Option<String>),

    #[error("blocked: private dns resolution")]
    BlockedPrivateResolution(Option<String>),

    #[error("unsupported content type")]
    UnsupportedContentType(Option<String>),

    #[error("navigation failed")]
    NavigationFailed(Option<String>),

    #[error("extraction failed")]
    ExtractionFailed(Option<String>),

    #[error("upstream search error")]
    UpstreamSearchError(Option<String>),
}

impl ScrapeError {
    /// The stable wire name used in `{error: kind}` responses.
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::InvalidUrl(_) => "invalid_url",
            ScrapeError::UnsupportedProtocol(_) => "unsupported_protocol",
            ScrapeError::BlockedLocalhost(_) => "blocked_localhost",
            ScrapeError::BlockedPrivateIp(_) => "blocked_private_ip",
            ScrapeError::BlockedPrivateHostname(_) => "blocked_private_hostname",
            ScrapeError::BlockedPrivateResolution(_) => "blocked_private_resolution",
            ScrapeError::UnsupportedContentType(_) => "unsupported_content_type",
            ScrapeError::NavigationFailed(_) => "navigation_failed",
            ScrapeError::ExtractionFailed(_) => "extraction_failed",
            ScrapeError::UpstreamSearchError(_) => "upstream_search_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ScrapeError::InvalidUrl(_)
            | ScrapeError::UnsupportedProtocol(_)
            | ScrapeError::BlockedLocalhost(_)
            | ScrapeError::BlockedPrivateIp(_)
            | ScrapeError::BlockedPrivateHostname(_)
            | ScrapeError::BlockedPrivateResolution(_)
            | ScrapeError::UnsupportedContentType(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ScrapeError::NavigationFailed(_) | ScrapeError::ExtractionFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ScrapeError::UpstreamSearchError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn retryable(&self) -> bool {
        matches!(
            self,
            ScrapeError::NavigationFailed(_)
                | ScrapeError::ExtractionFailed(_)
                | ScrapeError::UpstreamSearchError(_)
        )
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            ScrapeError::InvalidUrl(d)
            | ScrapeError::UnsupportedProtocol(d)
            | ScrapeError::BlockedLocalhost(d)
            | ScrapeError::BlockedPrivateIp(d)
            | ScrapeError::BlockedPrivateHostname(d)
            | ScrapeError::BlockedPrivateResolution(d)
            | ScrapeError::UnsupportedContentType(d)
            | ScrapeError::NavigationFailed(d)
            | ScrapeError::ExtractionFailed(d)
            | ScrapeError::UpstreamSearchError(d) => d.as_deref(),
        }
    }

    /// Map an SSRF guard rejection onto the matching error variant.
    pub fn from_block_reason(reason: BlockReason) -> Self {
        match reason {
            BlockReason::InvalidUrl => ScrapeError::InvalidUrl(None),
            BlockReason::UnsupportedProtocol => ScrapeError::UnsupportedProtocol(None),
            BlockReason::BlockedLocalhost => ScrapeError::BlockedLocalhost(None),
            BlockReason::BlockedPrivateIp => ScrapeError::BlockedPrivateIp(None),
            BlockReason::BlockedPrivateHostname => ScrapeError::BlockedPrivateHostname(None),
            BlockReason::BlockedPrivateResolution => ScrapeError::BlockedPrivateResolution(None),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl IntoResponse for ScrapeError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind(),
            detail: self.detail().map(str::to_owned),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_wire_name() {
        assert_eq!(ScrapeError::InvalidUrl(None).kind(), "invalid_url");
        assert_eq!(
            ScrapeError::BlockedPrivateResolution(None).kind(),
            "blocked_private_resolution"
        );
        assert_eq!(
            ScrapeError::UpstreamSearchError(None).kind(),
            "upstream_search_error"
        );
    }

    #[test]
    fn status_codes_follow_spec_table() {
        assert_eq!(
            ScrapeError::InvalidUrl(None).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ScrapeError::NavigationFailed(None).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ScrapeError::UpstreamSearchError(None).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn retryable_flags_match_spec() {
        assert!(!ScrapeError::InvalidUrl(None).retryable());
        assert!(ScrapeError::NavigationFailed(None).retryable());
        assert!(ScrapeError::ExtractionFailed(None).retryable());
        assert!(ScrapeError::UpstreamSearchError(None).retryable());
    }

    #[test]
    fn from_block_reason_maps_every_variant() {
        assert_eq!(
            ScrapeError::from_block_reason(BlockReason::BlockedLocalhost).kind(),
            "blocked_localhost"
        );
        assert_eq!(
            ScrapeError::from_block_reason(BlockReason::BlockedPrivateIp).kind(),
            "blocked_private_ip"
        );
    }
}
