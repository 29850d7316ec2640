// src/ingest/mod.rs
pub mod field;
pub mod locators;
pub mod normalize;
pub mod platform;
pub mod providers;
pub mod scheduler;
pub mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;

use crate::ingest::types::{Record, SourceProvider};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "feed_records_extracted_total",
            "Records accepted from live sources."
        );
        describe_counter!(
            "feed_source_errors_total",
            "Source fetch/parse errors."
        );
        describe_counter!(
            "feed_source_timeouts_total",
            "Sources that exceeded their timeout."
        );
        describe_counter!("feed_refresh_total", "Completed feed refreshes.");
        describe_counter!(
            "feed_refresh_coalesced_total",
            "Refresh requests served by an in-flight refresh."
        );
        describe_counter!("feed_cache_hits_total", "Reads served fresh from cache.");
        describe_counter!(
            "feed_cache_stale_served_total",
            "Reads served stale while a refresh ran."
        );
        describe_histogram!("feed_refresh_ms", "Feed refresh time in milliseconds.");
        describe_gauge!(
            "feed_last_refresh_ts",
            "Unix ts when the feed was last rebuilt."
        );
        describe_gauge!("feed_cache_ttl_secs", "Configured cache ttl in seconds.");
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Ok,
    Failed,
    TimedOut,
}

/// What one provider contributed to a refresh.
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub provider: &'static str,
    pub status: OutcomeStatus,
    pub records: Vec<Record>,
}

/// Results of one concurrent collection round.
#[derive(Debug, Clone, Default)]
pub struct Harvest {
    pub outcomes: Vec<SourceOutcome>,
}

impl Harvest {
    /// True when at least one provider ran and none of them succeeded.
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty()
            && self
                .outcomes
                .iter()
                .all(|o| o.status != OutcomeStatus::Ok)
    }

    pub fn live_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.records.len()).sum()
    }

    pub fn into_records(self) -> Vec<Record> {
        self.outcomes
            .into_iter()
            .flat_map(|o| o.records)
            .collect()
    }
}

/// Run every provider concurrently, each bounded by `per_source_timeout`.
///
/// Errors and timeouts only zero out that provider's contribution.
pub async fn collect(
    providers: &[Arc<dyn SourceProvider>],
    per_source_timeout: Duration,
) -> Harvest {
    ensure_metrics_described();

    let mut set = JoinSet::new();
    for (idx, p) in providers.iter().enumerate() {
        let p = Arc::clone(p);
        set.spawn(async move {
            let t0 = Instant::now();
            let res = tokio::time::timeout(per_source_timeout, p.fetch_latest()).await;
            (idx, p.name(), res, t0.elapsed())
        });
    }

    let mut slots: Vec<Option<SourceOutcome>> = vec![None; providers.len()];
    while let Some(joined) = set.join_next().await {
        let (idx, provider, res, took) = match joined {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, "provider task panicked");
                counter!("feed_source_errors_total").increment(1);
                continue;
            }
        };
        let outcome = match res {
            Ok(Ok(records)) => {
                tracing::info!(
                    target: "ingest",
                    provider,
                    count = records.len(),
                    ms = took.as_millis() as u64,
                    "provider ok"
                );
                counter!("feed_records_extracted_total").increment(records.len() as u64);
                SourceOutcome {
                    provider,
                    status: OutcomeStatus::Ok,
                    records,
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(target: "ingest", error = ?e, provider, "provider error");
                counter!("feed_source_errors_total").increment(1);
                SourceOutcome {
                    provider,
                    status: OutcomeStatus::Failed,
                    records: Vec::new(),
                }
            }
            Err(_) => {
                tracing::warn!(
                    target: "ingest",
                    provider,
                    timeout_ms = per_source_timeout.as_millis() as u64,
                    "provider timed out"
                );
                counter!("feed_source_timeouts_total").increment(1);
                SourceOutcome {
                    provider,
                    status: OutcomeStatus::TimedOut,
                    records: Vec::new(),
                }
            }
        };
        slots[idx] = Some(outcome);
    }

    // Keep configuration order so each provider's own record order survives to the shuffle.
    let outcomes = slots
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| {
            slot.unwrap_or_else(|| SourceOutcome {
                provider: providers[idx].name(),
                status: OutcomeStatus::Failed,
                records: Vec::new(),
            })
        })
        .collect();

    Harvest { outcomes }
}
