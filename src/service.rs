//! Read operations over the cached feed, as used by the HTTP layer.

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::cache::{CacheRead, CacheStatus, FeedCache};
use crate::feed::Feed;
use crate::ingest::types::Source;

pub const MIN_QUERY_CHARS: usize = 2;

#[derive(Clone)]
pub struct FeedService {
    cache: Arc<FeedCache>,
}

impl FeedService {
    pub fn new(cache: Arc<FeedCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<FeedCache> {
        &self.cache
    }

    pub async fn fetch(&self) -> CacheRead {
        self.cache.get().await
    }

    /// Records whose title or source name contains `query` (case-insensitive).
    /// Queries shorter than two characters after trimming are rejected.
    pub async fn search(&self, query: &str) -> Result<(Feed, CacheStatus)> {
        let needle = normalize_query(query)?;
        let read = self.cache.get().await;
        let feed = read.feed.filtered(|r| {
            r.title.to_lowercase().contains(&needle)
                || r.source.as_str().contains(&needle)
                || r.source.display_name().to_lowercase().contains(&needle)
        });
        Ok((feed, read.status))
    }

    /// Records from one source. Unknown names yield an empty feed.
    pub async fn by_source(&self, name: &str) -> (Feed, CacheStatus) {
        let wanted = name.parse::<Source>().ok();
        let read = self.cache.get().await;
        let feed = read.feed.filtered(|r| Some(r.source) == wanted);
        (feed, read.status)
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}

pub fn normalize_query(query: &str) -> Result<String> {
    let q = query.trim();
    if q.chars().count() < MIN_QUERY_CHARS {
        bail!("query must have at least {MIN_QUERY_CHARS} characters");
    }
    Ok(q.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_validation() {
        assert!(normalize_query(" a ").is_err());
        assert!(normalize_query("").is_err());
        assert_eq!(normalize_query("  Fone ").unwrap(), "fone");
    }
}
