//! Affiliate tagging for outbound links of the designated source.

use url::Url;

use crate::ingest::types::{Record, Source};

pub const AFFILIATE_QUERY_KEY: &str = "affiliate_id";
pub const DEFAULT_AFFILIATE_ID: &str = "18369330491";
pub const AFFILIATE_SOURCE: Source = Source::Shopee;

#[derive(Debug, Clone)]
pub struct AffiliateRewriter {
    source: Source,
    key: String,
    id: String,
}

impl Default for AffiliateRewriter {
    fn default() -> Self {
        Self::new(DEFAULT_AFFILIATE_ID)
    }
}

impl AffiliateRewriter {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            source: AFFILIATE_SOURCE,
            key: AFFILIATE_QUERY_KEY.to_string(),
            id: id.into(),
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// Add the affiliate parameter unless the record already carries it.
    /// Other sources and unparsable URLs pass through untouched.
    pub fn rewrite(&self, mut record: Record) -> Record {
        if record.source != self.source {
            return record;
        }
        let mut url = match Url::parse(&record.url) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(
                    target: "ingest",
                    url = %record.url,
                    error = %e,
                    "affiliate rewrite skipped: unparsable url"
                );
                return record;
            }
        };
        if url.query_pairs().any(|(k, _)| k == self.key.as_str()) {
            return record;
        }
        url.query_pairs_mut().append_pair(&self.key, &self.id);
        record.url = url.into();
        record
    }

    pub fn rewrite_all(&self, records: Vec<Record>) -> Vec<Record> {
        records.into_iter().map(|r| self.rewrite(r)).collect()
    }
}
