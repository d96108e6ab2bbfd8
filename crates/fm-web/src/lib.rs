//! Axum JSON API over the ingest pipeline: a dry listing fetch, a manual
//! ingest trigger, and the public preview feed consumed by the landing page.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use fm_pipeline::{build_pipeline, maybe_build_scheduler, IngestPipeline, PipelineConfig};
use fm_source::preview_projection;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub const CRATE_NAME: &str = "fm-web";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestPipeline>,
    pub bearer_token: String,
    pub preview_blob_url: Option<String>,
    http: reqwest::Client,
}

impl AppState {
    pub fn new(pipeline: Arc<IngestPipeline>, bearer_token: impl Into<String>) -> Self {
        Self {
            pipeline,
            bearer_token: bearer_token.into(),
            preview_blob_url: None,
            http: reqwest::Client::new(),
        }
    }

    /// Serve `/preview` from the published blob cache instead of a live
    /// upstream fetch.
    pub fn with_preview_blob(mut self, url: impl Into<String>) -> Self {
        self.preview_blob_url = Some(url.into());
        self
    }
}

#[derive(Debug, Deserialize, Default)]
struct ListingsQuery {
    per_page: Option<usize>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/listings", get(listings_handler))
        .route("/listings/ingest", post(ingest_handler))
        .route("/preview", get(preview_handler).options(preview_preflight))
        .with_state(Arc::new(state))
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    let config = PipelineConfig::from_env();
    let pipeline = Arc::new(build_pipeline(&config).await?);

    let scheduler = maybe_build_scheduler(pipeline.clone(), &config).await?;
    if let Some(sched) = scheduler {
        sched.start().await?;
        info!(cron = %config.ingest_cron, "ingest scheduler started");
    }

    let mut state = AppState::new(pipeline, config.bearer_token.clone());
    if let Some(url) = &config.preview_blob_url {
        state = state.with_preview_blob(url.clone());
    }
    let listener = TcpListener::bind(("0.0.0.0", config.web_port)).await?;
    info!(port = config.web_port, "web server listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// An empty configured token denies every request rather than opening the
/// guarded routes to the world.
fn authorized(headers: &HeaderMap, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|presented| presented == token)
        .unwrap_or(false)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "unauthorized" })),
    )
        .into_response()
}

fn upstream_error(err: impl std::fmt::Display) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({ "error": err.to_string() })),
    )
        .into_response()
}

fn with_cors(mut resp: Response) -> Response {
    let headers = resp.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );
    resp
}

async fn index_handler() -> Response {
    Json(json!({
        "service": "firstmover",
        "status": "ok",
    }))
    .into_response()
}

async fn listings_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListingsQuery>,
) -> Response {
    if !authorized(&headers, &state.bearer_token) {
        return unauthorized();
    }
    match state.pipeline.fetch_batch(query.per_page).await {
        Ok(listings) => Json(listings).into_response(),
        Err(err) => {
            warn!(error = %err, "listing fetch failed");
            upstream_error(err)
        }
    }
}

async fn ingest_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListingsQuery>,
) -> Response {
    if !authorized(&headers, &state.bearer_token) {
        return unauthorized();
    }
    match state.pipeline.run_once_with(query.per_page).await {
        Ok(summary) => Json(summary).into_response(),
        Err(err) => {
            warn!(error = %err, "manual ingest run failed");
            upstream_error(err)
        }
    }
}

async fn preview_handler(State(state): State<Arc<AppState>>) -> Response {
    // Prefer the published blob so public traffic stays off the upstream
    // search; fall back to a live fetch when no cache is configured or the
    // cache read fails.
    if let Some(url) = &state.preview_blob_url {
        match fetch_published_preview(&state.http, url).await {
            Ok(preview) => return with_cors(Json(preview).into_response()),
            Err(err) => {
                warn!(error = %err, "published preview fetch failed; falling back to live fetch");
            }
        }
    }
    match state.pipeline.fetch_batch(None).await {
        Ok(listings) => {
            with_cors(Json(preview_projection(&listings, Utc::now())).into_response())
        }
        Err(err) => {
            warn!(error = %err, "preview fetch failed");
            with_cors(upstream_error(err))
        }
    }
}

async fn fetch_published_preview(
    client: &reqwest::Client,
    url: &str,
) -> Result<serde_json::Value, reqwest::Error> {
    client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
}

async fn preview_preflight() -> Response {
    with_cors(StatusCode::NO_CONTENT.into_response())
}
