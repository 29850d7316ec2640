//! The aggregated response unit and its provenance tag.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::affiliate::AFFILIATE_SOURCE;
use crate::ingest::types::{Record, Source};

/// America/Sao_Paulo (no DST since 2019).
const SAO_PAULO_OFFSET_SECS: i32 = -3 * 3600;

/// How a feed was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    #[serde(rename = "live")]
    Live,
    #[serde(rename = "live+fallback")]
    LiveWithFallback,
    #[serde(rename = "fallback")]
    Fallback,
    #[serde(rename = "fallback-error")]
    FallbackError,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Live => "live",
            Origin::LiveWithFallback => "live+fallback",
            Origin::Fallback => "fallback",
            Origin::FallbackError => "fallback-error",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    #[serde(rename = "products")]
    pub records: Vec<Record>,
    #[serde(rename = "lastUpdate")]
    pub last_update: String,
    #[serde(rename = "totalProducts")]
    pub total_count: usize,
    #[serde(rename = "platforms")]
    pub counts_by_source: BTreeMap<Source, usize>,
    #[serde(rename = "hasAffiliateShopee")]
    pub has_affiliate: bool,
    #[serde(rename = "source")]
    pub origin: Origin,
    #[serde(skip)]
    pub generated_at: DateTime<Utc>,
}

impl Feed {
    /// Build a feed; counts and flags are always derived from `records`.
    pub fn new(records: Vec<Record>, origin: Origin, generated_at: DateTime<Utc>) -> Self {
        let counts_by_source = count_by_source(&records);
        let has_affiliate = counts_by_source.contains_key(&AFFILIATE_SOURCE);
        Self {
            total_count: records.len(),
            last_update: format_last_update(generated_at),
            records,
            counts_by_source,
            has_affiliate,
            origin,
            generated_at,
        }
    }

    /// Same feed restricted to records matching `keep`; origin and timestamp are preserved.
    pub fn filtered<F>(&self, keep: F) -> Feed
    where
        F: Fn(&Record) -> bool,
    {
        let records = self.records.iter().filter(|r| keep(r)).cloned().collect();
        let mut out = Feed::new(records, self.origin, self.generated_at);
        out.last_update = self.last_update.clone();
        out
    }
}

pub fn count_by_source(records: &[Record]) -> BTreeMap<Source, usize> {
    let mut counts = BTreeMap::new();
    for r in records {
        *counts.entry(r.source).or_insert(0) += 1;
    }
    counts
}

/// Human-readable pt-BR timestamp in São Paulo time, e.g. `16/10/2026, 14:03:22`.
pub fn format_last_update(ts: DateTime<Utc>) -> String {
    let tz = FixedOffset::east_opt(SAO_PAULO_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    ts.with_timezone(&tz).format("%d/%m/%Y, %H:%M:%S").to_string()
}
