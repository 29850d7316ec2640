// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod affiliate;
pub mod aggregate;
pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod feed;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod service;
pub mod snapshot;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::cache::FeedCache;
pub use crate::config::FeedConfig;
pub use crate::feed::{Feed, Origin};
pub use crate::ingest::types::{Record, Source};
pub use crate::pipeline::FeedPipeline;

use std::sync::Arc;

use axum::Router;
use tracing::info;

use crate::ingest::scheduler::{spawn_refresh_scheduler, RefreshSchedulerCfg};

/// Wire the full service from `cfg`: metrics, pipeline, cache warm-up,
/// periodic refresh and routes.
///
/// The cache is populated before the router is returned, so the first
/// request never waits on a cold start.
pub async fn app_with_config(cfg: FeedConfig) -> anyhow::Result<Router> {
    // Recorder first, so gauges set during wiring are not lost.
    if let Err(e) = metrics::Metrics::init() {
        tracing::warn!(error = ?e, "metrics recorder unavailable");
    }

    let pipeline = Arc::new(FeedPipeline::from_config(&cfg)?);
    info!(
        providers = ?pipeline.provider_names(),
        ttl_secs = cfg.cache_ttl.as_secs(),
        "feed pipeline configured"
    );

    let state = api::AppState::new(FeedCache::new(
        pipeline,
        cfg.cache_ttl,
        cfg.hard_ceiling(),
    ));
    let router = api::router(state.clone());

    let cache = Arc::clone(state.service.cache());
    let feed = cache.refresh().await;
    info!(total = feed.total_count, origin = %feed.origin, "feed cache warmed");

    spawn_refresh_scheduler(
        cache,
        RefreshSchedulerCfg {
            interval: cfg.refresh_interval,
        },
    );

    Ok(router)
}

/// [`app_with_config`] with configuration read from the environment.
pub async fn app() -> anyhow::Result<Router> {
    app_with_config(FeedConfig::from_env()).await
}
