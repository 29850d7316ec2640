//! # Feed cache
//! Process-wide holder of the last aggregated feed.
//!
//! - Fresh reads (age < ttl) return the cached snapshot without touching sources.
//! - Stale reads (ttl <= age < hard ceiling) return the cached snapshot at once
//!   and start one background refresh.
//! - Empty cache, or a snapshot past the hard ceiling, makes the caller wait for
//!   a refresh.
//!
//! At most one refresh runs at a time. Callers that queued behind a refresh
//! which already published a newer generation get that result instead of
//! starting another one. New feeds are built off to the side and swapped in
//! whole; readers only ever see a complete `Arc<Feed>`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use metrics::{counter, gauge};

use crate::feed::Feed;
use crate::pipeline::FeedPipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from cache within ttl.
    Hit,
    /// Served from cache past ttl; a background refresh was triggered.
    Stale,
    /// Caller waited for a refresh it ran itself.
    Miss,
    /// Caller waited and got the result of another caller's refresh.
    Coalesced,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Stale => "STALE",
            CacheStatus::Miss => "MISS",
            CacheStatus::Coalesced => "COALESCED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheRead {
    pub feed: Arc<Feed>,
    pub status: CacheStatus,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    feed: Arc<Feed>,
    written_at: Instant,
}

#[derive(Debug, Default)]
struct State {
    entry: Option<CacheEntry>,
    /// Bumped on every successful write; never reset by `clear`.
    generation: u64,
}

pub struct FeedCache {
    state: RwLock<State>,
    refresh_lock: tokio::sync::Mutex<()>,
    refreshing: AtomicBool,
    ttl: Duration,
    hard_ceiling: Duration,
    pipeline: Arc<FeedPipeline>,
}

impl FeedCache {
    pub fn new(pipeline: Arc<FeedPipeline>, ttl: Duration, hard_ceiling: Duration) -> Arc<Self> {
        gauge!("feed_cache_ttl_secs").set(ttl.as_secs_f64());
        Arc::new(Self {
            state: RwLock::new(State::default()),
            refresh_lock: tokio::sync::Mutex::new(()),
            refreshing: AtomicBool::new(false),
            ttl,
            hard_ceiling: hard_ceiling.max(ttl),
            pipeline,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn pipeline(&self) -> &FeedPipeline {
        &self.pipeline
    }

    /// Current feed and how it was obtained.
    pub async fn get(self: &Arc<Self>) -> CacheRead {
        let (entry, generation) = self.snapshot();
        if let Some(entry) = entry {
            let age = entry.written_at.elapsed();
            if age < self.ttl {
                counter!("feed_cache_hits_total").increment(1);
                return CacheRead {
                    feed: entry.feed,
                    status: CacheStatus::Hit,
                };
            }
            if age < self.hard_ceiling {
                counter!("feed_cache_stale_served_total").increment(1);
                self.spawn_refresh();
                return CacheRead {
                    feed: entry.feed,
                    status: CacheStatus::Stale,
                };
            }
            tracing::warn!(
                target: "cache",
                age_secs = age.as_secs(),
                "cached feed past hard ceiling; refreshing inline"
            );
        }

        let (feed, coalesced) = self.refresh_after(generation).await;
        CacheRead {
            feed,
            status: if coalesced {
                CacheStatus::Coalesced
            } else {
                CacheStatus::Miss
            },
        }
    }

    /// Rebuild now (startup warm-up, periodic timer). Coalesces with a
    /// refresh that is already running.
    pub async fn refresh(&self) -> Arc<Feed> {
        let (_, generation) = self.snapshot();
        self.refresh_after(generation).await.0
    }

    /// Drop the cached feed; the next read rebuilds it.
    pub fn clear(&self) {
        self.write_state().entry = None;
        tracing::info!(target: "cache", "feed cache cleared");
    }

    /// Cached feed, if any, regardless of age.
    pub fn peek(&self) -> Option<Arc<Feed>> {
        self.read_state().entry.as_ref().map(|e| Arc::clone(&e.feed))
    }

    pub fn generation(&self) -> u64 {
        self.read_state().generation
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    fn spawn_refresh(self: &Arc<Self>) {
        if self.refreshing.swap(true, Ordering::AcqRel) {
            return;
        }
        let this = Arc::clone(self);
        let (_, generation) = self.snapshot();
        tokio::spawn(async move {
            this.refresh_after(generation).await;
            this.refreshing.store(false, Ordering::Release);
        });
    }

    /// Single-flight refresh. Returns `(feed, coalesced)`.
    async fn refresh_after(&self, seen_generation: u64) -> (Arc<Feed>, bool) {
        let _guard = self.refresh_lock.lock().await;

        if let Some(feed) = self.newer_than(seen_generation) {
            counter!("feed_refresh_coalesced_total").increment(1);
            return (feed, true);
        }

        tracing::info!(target: "cache", "refreshing feed");
        let feed = Arc::new(self.pipeline.build().await);
        self.publish(Arc::clone(&feed));
        tracing::info!(
            target: "cache",
            origin = %feed.origin,
            total = feed.total_count,
            "feed refreshed"
        );
        (feed, false)
    }

    fn newer_than(&self, seen_generation: u64) -> Option<Arc<Feed>> {
        let st = self.read_state();
        if st.generation > seen_generation {
            st.entry.as_ref().map(|e| Arc::clone(&e.feed))
        } else {
            None
        }
    }

    fn publish(&self, feed: Arc<Feed>) {
        let mut st = self.write_state();
        st.generation += 1;
        st.entry = Some(CacheEntry {
            feed,
            written_at: Instant::now(),
        });
    }

    fn snapshot(&self) -> (Option<CacheEntry>, u64) {
        let st = self.read_state();
        (st.entry.clone(), st.generation)
    }

    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|p| p.into_inner())
    }
}
