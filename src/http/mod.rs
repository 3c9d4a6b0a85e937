//! HTTP surface (spec §6): `POST /scrape`, `POST /search`, `GET /healthz`.
//!
//! The teacher wires its tools into a router supplied by a sibling crate
//! (`kodegen_server_http`) that isn't part of this retrieval pack, so this
//! module stands up the same shape of surface directly with `axum` plus
//! `tower`/`tower-http` for tracing, timeout, and CORS layers.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::orchestrator::Orchestrator;
use crate::types::{ExtractionResult, OutputFormat, ScrapeOptions, SearchResultItem};

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<Orchestrator>,
    config: Arc<ServiceConfig>,
}

/// Build the application router: `/healthz` unauthenticated, `/scrape` and
/// `/search` behind the optional API-key check.
pub fn build_router(orchestrator: Arc<Orchestrator>, config: Arc<ServiceConfig>) -> Router {
    let state = AppState { orchestrator, config };

    let protected = Router::new()
        .route("/scrape", post(scrape_handler))
        .route("/search", post(search_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/healthz", get(healthz))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(120)))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn auth_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !state.config.auth_enabled() {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            request
                .headers()
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_string)
        });

    match provided {
        Some(key) if state.config.is_valid_api_key(&key) => next.run(request).await,
        _ => bad_status(StatusCode::UNAUTHORIZED, "unauthorized"),
    }
}

fn bad_status(status: StatusCode, kind: &'static str) -> Response {
    (status, Json(json!({ "error": kind }))).into_response()
}

#[derive(Debug, Deserialize)]
struct ScrapeRequestBody {
    url: Option<String>,
    #[serde(default)]
    formats: Vec<OutputFormat>,
    #[serde(default, rename = "onlyMainContent")]
    only_main_content: Option<bool>,
    #[serde(default, rename = "timeoutMs")]
    timeout_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ScrapeResponse {
    success: bool,
    data: ExtractionResult,
}

async fn scrape_handler(State(state): State<AppState>, Json(body): Json<ScrapeRequestBody>) -> Response {
    let Some(url) = body.url.filter(|u| !u.is_empty()) else {
        return bad_status(StatusCode::BAD_REQUEST, "missing_url");
    };

    let mut formats = body.formats;
    if formats.is_empty() {
        formats.push(OutputFormat::Markdown);
    }

    let opts = ScrapeOptions {
        formats,
        only_main_content: body.only_main_content.unwrap_or(true),
        timeout_ms: state.config.clamp_timeout_ms(body.timeout_ms),
    };

    match state.orchestrator.scrape(&url, opts).await {
        Ok(data) => Json(ScrapeResponse { success: true, data }).into_response(),
        Err(err) => err.into_response(),
    }
}

#[derive(Debug, Deserialize, Default)]
struct ScrapeOptionsBody {
    #[serde(default)]
    formats: Vec<OutputFormat>,
    #[serde(default, rename = "onlyMainContent")]
    only_main_content: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct SearchRequestBody {
    query: Option<String>,
    limit: Option<usize>,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default, rename = "scrapeOptions")]
    scrape_options: Option<ScrapeOptionsBody>,
}

#[derive(Debug, Serialize)]
struct SearchData {
    web: Vec<SearchResultItem>,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    success: bool,
    data: SearchData,
}

const DEFAULT_SEARCH_LIMIT: usize = 10;
const MAX_SEARCH_LIMIT: usize = 20;

async fn search_handler(State(state): State<AppState>, Json(body): Json<SearchRequestBody>) -> Response {
    let Some(query) = body.query.filter(|q| !q.is_empty()) else {
        return bad_status(StatusCode::BAD_REQUEST, "missing_query");
    };

    let limit = body
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);

    let scrape_opts = body.scrape_options.unwrap_or_default();

    match state
        .orchestrator
        .search(
            &query,
            limit,
            &body.sources,
            &scrape_opts.formats,
            scrape_opts.only_main_content.unwrap_or(true),
        )
        .await
    {
        Ok(web) => Json(SearchResponse {
            success: true,
            data: SearchData { web },
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_limit_clamps_to_bounds() {
        assert_eq!(5usize.clamp(1, MAX_SEARCH_LIMIT), 5);
        assert_eq!(0usize.clamp(1, MAX_SEARCH_LIMIT), 1);
        assert_eq!(999usize.clamp(1, MAX_SEARCH_LIMIT), MAX_SEARCH_LIMIT);
    }
}
