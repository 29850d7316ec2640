// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::cache::FeedCache;

#[derive(Clone, Copy, Debug)]
pub struct RefreshSchedulerCfg {
    pub interval: Duration,
}

/// Spawn a timer that rebuilds the cached feed every `interval`, whether or
/// not anyone is reading it. The first tick is skipped; startup warms the cache.
pub fn spawn_refresh_scheduler(cache: Arc<FeedCache>, cfg: RefreshSchedulerCfg) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = cfg.interval.max(Duration::from_secs(1));
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let feed = cache.refresh().await;
            tracing::info!(
                target: "ingest",
                total = feed.total_count,
                origin = %feed.origin,
                "scheduled refresh tick"
            );
        }
    })
}
