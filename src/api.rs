use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::cache::{CacheStatus, FeedCache};
use crate::feed::Feed;
use crate::ingest::providers::snapshot::SnapshotCheck;
use crate::metrics::Metrics;
use crate::service::FeedService;

/// Diagnostics header telling whether the feed came from cache.
pub const CACHE_HEADER: &str = "X-Feed-Cache";

const ROUTES: [&str; 9] = [
    "GET /",
    "GET /produtos",
    "GET /search?q=",
    "GET /platform/{name}",
    "POST /cache/clear",
    "GET /test",
    "GET /check-json",
    "GET /health",
    "GET /metrics",
];

#[derive(Clone)]
pub struct AppState {
    pub service: FeedService,
}

impl AppState {
    pub fn new(cache: Arc<FeedCache>) -> Self {
        Self {
            service: FeedService::new(cache),
        }
    }
}

/// Feed routes only (no `/metrics`).
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_feed))
        .route("/produtos", get(get_feed))
        .route("/search", get(search))
        .route("/platform/{name}", get(by_platform))
        .route("/cache/clear", post(clear_cache))
        .route("/test", get(diagnostics))
        .route("/check-json", get(check_snapshot))
        .route("/health", get(|| async { "ok" }))
        .fallback(not_found)
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Feed routes plus `/metrics` when the Prometheus recorder is available.
pub fn router(state: AppState) -> Router {
    let app = create_router(state);
    match Metrics::init() {
        Ok(m) => m.router().merge(app),
        Err(e) => {
            tracing::warn!(target: "api", error = ?e, "metrics disabled");
            app
        }
    }
}

fn feed_response(feed: &Feed, status: CacheStatus) -> Response {
    ([(CACHE_HEADER, status.as_str())], Json(feed)).into_response()
}

async fn get_feed(State(state): State<AppState>) -> Response {
    let read = state.service.fetch().await;
    feed_response(&read.feed, read.status)
}

#[derive(serde::Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    match state.service.search(&params.q).await {
        Ok((feed, status)) => feed_response(&feed, status),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": e.to_string(),
                "products": [],
                "totalProducts": 0,
            })),
        )
            .into_response(),
    }
}

async fn by_platform(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let (feed, status) = state.service.by_source(&name).await;
    feed_response(&feed, status)
}

async fn clear_cache(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.service.clear();
    Json(json!({
        "message": "cache cleared",
        "cleared": true,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn diagnostics(State(state): State<AppState>) -> Json<serde_json::Value> {
    let cache = state.service.cache();
    Json(json!({
        "message": "server running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "env": std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        "cache": {
            "populated": cache.peek().is_some(),
            "generation": cache.generation(),
            "refreshing": cache.is_refreshing(),
            "ttlSecs": cache.ttl().as_secs(),
        },
        "providers": cache.pipeline().provider_names(),
        "snapshotUrl": cache.pipeline().snapshot().map(|s| s.location()),
    }))
}

async fn check_snapshot(State(state): State<AppState>) -> Json<SnapshotCheck> {
    match state.service.cache().pipeline().snapshot() {
        Some(snapshot) => Json(snapshot.check().await),
        None => Json(SnapshotCheck::unconfigured()),
    }
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "route not found",
            "availableRoutes": ROUTES,
        })),
    )
}
