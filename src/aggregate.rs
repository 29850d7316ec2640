//! Merge per-source results into one feed and apply the fallback cascade.

use std::sync::Mutex;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::catalog::FallbackCatalog;
use crate::feed::{Feed, Origin};
use crate::ingest::Harvest;

pub const DEFAULT_MIN_RECORDS: usize = 8;
pub const DEFAULT_MAX_RECORDS: usize = 50;

#[derive(Debug)]
pub struct Aggregator {
    min_records: usize,
    max_records: usize,
    rng: Mutex<StdRng>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_RECORDS, DEFAULT_MAX_RECORDS)
    }
}

impl Aggregator {
    pub fn new(min_records: usize, max_records: usize) -> Self {
        Self::with_rng(min_records, max_records, StdRng::from_os_rng())
    }

    /// Deterministic shuffle for tests.
    pub fn with_seed(min_records: usize, max_records: usize, seed: u64) -> Self {
        Self::with_rng(min_records, max_records, StdRng::seed_from_u64(seed))
    }

    fn with_rng(min_records: usize, max_records: usize, rng: StdRng) -> Self {
        let max_records = max_records.max(1);
        Self {
            min_records: min_records.clamp(1, max_records),
            max_records,
            rng: Mutex::new(rng),
        }
    }

    pub fn min_records(&self) -> usize {
        self.min_records
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    /// Lower `min_records` to `ceiling` (at least 1). Returns the previous
    /// threshold when it had to move.
    pub fn cap_min_records(&mut self, ceiling: usize) -> Option<usize> {
        let ceiling = ceiling.max(1);
        if self.min_records <= ceiling {
            return None;
        }
        let wanted = self.min_records;
        self.min_records = ceiling;
        Some(wanted)
    }

    /// Shuffle live records, top up from the catalog when there are fewer
    /// than `min_records`, and cap at `max_records`.
    ///
    /// Origin: `live` when the threshold is met, `live+fallback` when topped
    /// up, `fallback` with no live records, and `fallback-error` when every
    /// source failed outright.
    pub fn aggregate(&self, harvest: Harvest, catalog: &FallbackCatalog) -> Feed {
        let all_failed = harvest.all_failed();
        let mut records = harvest.into_records();
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());

        records.shuffle(&mut *rng);
        let live = records.len();

        let origin = match live {
            0 if all_failed => Origin::FallbackError,
            0 => Origin::Fallback,
            n if n < self.min_records => Origin::LiveWithFallback,
            _ => Origin::Live,
        };

        if live < self.min_records {
            let mut extra = catalog.records().to_vec();
            extra.shuffle(&mut *rng);
            records.extend(extra);
        }
        records.truncate(self.max_records);

        tracing::info!(
            target: "ingest",
            live,
            total = records.len(),
            origin = %origin,
            "feed aggregated"
        );
        Feed::new(records, origin, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affiliate::AffiliateRewriter;
    use crate::ingest::types::{Record, Source};
    use crate::ingest::{OutcomeStatus, SourceOutcome};

    fn rec(source: Source, i: usize) -> Record {
        Record {
            title: format!("Produto numero {i}"),
            price: "R$ 1,00".into(),
            image: String::new(),
            url: format!("https://x.example/{i}"),
            discount: String::new(),
            source,
            fetched_at: Utc::now(),
        }
    }

    fn outcome(status: OutcomeStatus, n: usize) -> SourceOutcome {
        SourceOutcome {
            provider: "test",
            status,
            records: (0..n).map(|i| rec(Source::Amazon, i)).collect(),
        }
    }

    fn catalog() -> FallbackCatalog {
        FallbackCatalog::new(&AffiliateRewriter::default())
    }

    #[test]
    fn origin_cascade() {
        let agg = Aggregator::with_seed(8, 50, 1);
        let cat = catalog();

        let live = agg.aggregate(
            Harvest {
                outcomes: vec![outcome(OutcomeStatus::Ok, 9)],
            },
            &cat,
        );
        assert_eq!(live.origin, Origin::Live);
        assert_eq!(live.total_count, 9);

        let topped = agg.aggregate(
            Harvest {
                outcomes: vec![outcome(OutcomeStatus::Ok, 3)],
            },
            &cat,
        );
        assert_eq!(topped.origin, Origin::LiveWithFallback);
        assert_eq!(topped.total_count, 3 + cat.len());

        let empty = agg.aggregate(
            Harvest {
                outcomes: vec![outcome(OutcomeStatus::Ok, 0), outcome(OutcomeStatus::Failed, 0)],
            },
            &cat,
        );
        assert_eq!(empty.origin, Origin::Fallback);

        let failed = agg.aggregate(
            Harvest {
                outcomes: vec![
                    outcome(OutcomeStatus::Failed, 0),
                    outcome(OutcomeStatus::TimedOut, 0),
                ],
            },
            &cat,
        );
        assert_eq!(failed.origin, Origin::FallbackError);
        assert_eq!(failed.total_count, cat.len());
    }

    #[test]
    fn live_records_come_first_and_output_is_capped() {
        let agg = Aggregator::with_seed(8, 10, 5);
        let cat = catalog();
        let feed = agg.aggregate(
            Harvest {
                outcomes: vec![outcome(OutcomeStatus::Ok, 4)],
            },
            &cat,
        );
        assert_eq!(feed.total_count, 10);
        assert!(feed.records[..4].iter().all(|r| r.url.starts_with("https://x.example/")));
    }

    #[test]
    fn capped_threshold_is_met_by_one_live_record() {
        let cat = catalog();
        let mut agg = Aggregator::with_seed(20, 50, 3);
        assert_eq!(agg.cap_min_records(cat.len() + 1), Some(20));
        assert_eq!(agg.min_records(), cat.len() + 1);
        assert_eq!(agg.cap_min_records(cat.len() + 1), None);

        let feed = agg.aggregate(
            Harvest {
                outcomes: vec![outcome(OutcomeStatus::Ok, 1)],
            },
            &cat,
        );
        assert_eq!(feed.origin, Origin::LiveWithFallback);
        assert!(feed.total_count >= agg.min_records());
    }

    #[test]
    fn same_seed_same_order() {
        let cat = catalog();
        let h = || Harvest {
            outcomes: vec![outcome(OutcomeStatus::Ok, 20)],
        };
        let a = Aggregator::with_seed(8, 50, 9).aggregate(h(), &cat);
        let b = Aggregator::with_seed(8, 50, 9).aggregate(h(), &cat);
        let urls = |f: &Feed| f.records.iter().map(|r| r.url.clone()).collect::<Vec<_>>();
        assert_eq!(urls(&a), urls(&b));
    }
}
