// src/config/feed.rs
use std::time::Duration;

use crate::affiliate::DEFAULT_AFFILIATE_ID;
use crate::aggregate::{DEFAULT_MAX_RECORDS, DEFAULT_MIN_RECORDS};
use crate::config::sources::resolve_sources;
use crate::ingest::platform::DEFAULT_PER_SOURCE_CAP;
use crate::ingest::types::Source;

pub const ENV_CACHE_TTL_SECS: &str = "FEED_CACHE_TTL_SECS";
pub const ENV_HARD_CEILING_FACTOR: &str = "FEED_HARD_CEILING_FACTOR";
pub const ENV_REFRESH_INTERVAL_SECS: &str = "FEED_REFRESH_INTERVAL_SECS";
pub const ENV_SOURCE_TIMEOUT_SECS: &str = "FEED_SOURCE_TIMEOUT_SECS";
pub const ENV_MIN_RECORDS: &str = "FEED_MIN_RECORDS";
pub const ENV_MAX_RECORDS: &str = "FEED_MAX_RECORDS";
pub const ENV_PER_SOURCE_CAP: &str = "FEED_PER_SOURCE_CAP";
pub const ENV_PAGES: &str = "FEED_PAGES";
pub const ENV_PAGE_DELAY_MS: &str = "FEED_PAGE_DELAY_MS";
pub const ENV_AFFILIATE_ID: &str = "FEED_AFFILIATE_ID";
pub const ENV_SNAPSHOT_URL: &str = "FEED_SNAPSHOT_URL";

/// Runtime knobs for the pipeline, cache and scheduler.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub cache_ttl: Duration,
    /// Stale feeds older than `cache_ttl * hard_ceiling_factor` are not served.
    pub hard_ceiling_factor: u32,
    pub refresh_interval: Duration,
    pub source_timeout: Duration,
    pub min_records: usize,
    pub max_records: usize,
    pub per_source_cap: usize,
    pub pages: u32,
    pub page_delay: Duration,
    pub affiliate_id: String,
    pub snapshot_url: Option<String>,
    pub sources: Vec<Source>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(1800),
            hard_ceiling_factor: 4,
            refresh_interval: Duration::from_secs(3600),
            source_timeout: Duration::from_secs(15),
            min_records: DEFAULT_MIN_RECORDS,
            max_records: DEFAULT_MAX_RECORDS,
            per_source_cap: DEFAULT_PER_SOURCE_CAP,
            pages: 2,
            page_delay: Duration::from_millis(1500),
            affiliate_id: DEFAULT_AFFILIATE_ID.to_string(),
            snapshot_url: None,
            sources: Source::ALL.to_vec(),
        }
    }
}

impl FeedConfig {
    /// Read overrides from the environment. Invalid values keep their defaults.
    pub fn from_env() -> Self {
        let d = Self::default();

        let sources = match resolve_sources() {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "source list unreadable; enabling all sources");
                d.sources.clone()
            }
        };

        let mut cfg = Self {
            cache_ttl: env_secs(ENV_CACHE_TTL_SECS).unwrap_or(d.cache_ttl),
            hard_ceiling_factor: env_parse(ENV_HARD_CEILING_FACTOR).unwrap_or(d.hard_ceiling_factor),
            refresh_interval: env_secs(ENV_REFRESH_INTERVAL_SECS).unwrap_or(d.refresh_interval),
            source_timeout: env_secs(ENV_SOURCE_TIMEOUT_SECS).unwrap_or(d.source_timeout),
            min_records: env_parse(ENV_MIN_RECORDS).unwrap_or(d.min_records),
            max_records: env_parse(ENV_MAX_RECORDS).unwrap_or(d.max_records),
            per_source_cap: env_parse(ENV_PER_SOURCE_CAP).unwrap_or(d.per_source_cap),
            pages: env_parse(ENV_PAGES).unwrap_or(d.pages),
            page_delay: env_parse::<u64>(ENV_PAGE_DELAY_MS)
                .map(Duration::from_millis)
                .unwrap_or(d.page_delay),
            affiliate_id: std::env::var(ENV_AFFILIATE_ID)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(d.affiliate_id),
            snapshot_url: std::env::var(ENV_SNAPSHOT_URL)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            sources,
        };
        cfg.sanitize();
        cfg
    }

    /// Clamp values into a coherent range.
    pub fn sanitize(&mut self) {
        self.max_records = self.max_records.max(1);
        self.min_records = self.min_records.clamp(1, self.max_records);
        self.hard_ceiling_factor = self.hard_ceiling_factor.max(1);
        self.pages = self.pages.max(1);
        if self.cache_ttl.is_zero() {
            self.cache_ttl = Duration::from_secs(1);
        }
        if self.source_timeout.is_zero() {
            self.source_timeout = Duration::from_secs(1);
        }
    }

    pub fn hard_ceiling(&self) -> Duration {
        self.cache_ttl.saturating_mul(self.hard_ceiling_factor)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn env_secs(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_secs)
}
