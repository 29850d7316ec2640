// src/ingest/providers/listing.rs
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rand::Rng;
use tokio::time::Instant;

use crate::ingest::locators::{self, SourceLocatorSet};
use crate::ingest::platform::{self, DEFAULT_PER_SOURCE_CAP};
use crate::ingest::types::{Record, Source, SourceProvider};

// Kept back from the fetch budget so the provider returns before the
// collector's own per-source timeout fires.
const BUDGET_MARGIN: Duration = Duration::from_millis(250);
// Below this, a page request is not worth starting.
const MIN_PAGE_TIME: Duration = Duration::from_millis(500);

/// Scrapes a marketplace's deal listing pages.
pub struct ListingProvider {
    source: Source,
    cap: usize,
    mode: Mode,
}

enum Mode {
    // Pre-fetched documents, one per page.
    Fixture(Vec<String>),
    Http {
        client: reqwest::Client,
        pages: u32,
        page_delay: Duration,
        budget: Option<Duration>,
        listing_url: Option<String>,
    },
}

/// Whether another page (worst-case jittered delay plus a request) still fits
/// in what is left of the fetch budget.
fn next_page_fits(remaining: Duration, page_delay: Duration) -> bool {
    remaining >= page_delay * 2 + MIN_PAGE_TIME
}

impl ListingProvider {
    pub fn from_fixture(source: Source, html: &str) -> Self {
        Self::from_fixture_pages(source, vec![html.to_string()])
    }

    pub fn from_fixture_pages(source: Source, pages: Vec<String>) -> Self {
        Self {
            source,
            cap: DEFAULT_PER_SOURCE_CAP,
            mode: Mode::Fixture(pages),
        }
    }

    pub fn http(source: Source, client: reqwest::Client, pages: u32, page_delay: Duration) -> Self {
        Self {
            source,
            cap: DEFAULT_PER_SOURCE_CAP,
            mode: Mode::Http {
                client,
                pages: pages.max(1),
                page_delay,
                budget: None,
                listing_url: None,
            },
        }
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    /// Bound the whole multi-page fetch by `budget`. Pages that would not
    /// finish in time are skipped so records already scraped are returned.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        if let Mode::Http { budget: b, .. } = &mut self.mode {
            *b = Some(budget);
        }
        self
    }

    /// Override the listing URL template (`{page}` is substituted).
    pub fn with_listing_url(mut self, template: impl Into<String>) -> Self {
        if let Mode::Http { listing_url, .. } = &mut self.mode {
            *listing_url = Some(template.into());
        }
        self
    }

    pub fn source(&self) -> Source {
        self.source
    }

    fn locator_set(&self) -> &'static SourceLocatorSet {
        SourceLocatorSet::for_source(self.source)
    }

    async fn fetch_page(
        client: &reqwest::Client,
        url: &str,
        timeout: Option<Duration>,
    ) -> Result<String> {
        let mut req = client.get(url);
        if let Some(t) = timeout {
            req = req.timeout(t);
        }
        let resp = req
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("GET {url} returned HTTP {status}"));
        }
        resp.text().await.with_context(|| format!("reading body of {url}"))
    }
}

#[async_trait]
impl SourceProvider for ListingProvider {
    async fn fetch_latest(&self) -> Result<Vec<Record>> {
        let set = self.locator_set();
        let mut out: Vec<Record> = Vec::new();

        match &self.mode {
            Mode::Fixture(pages) => {
                for page in pages {
                    if out.len() >= self.cap {
                        break;
                    }
                    out.extend(platform::extract(page, set, self.cap - out.len()));
                }
            }

            Mode::Http {
                client,
                pages,
                page_delay,
                budget,
                listing_url,
            } => {
                let table = locators::table_for(self.source);
                let template = listing_url.as_deref().unwrap_or(table.listing_url);
                let deadline = budget.map(|b| Instant::now() + b.saturating_sub(BUDGET_MARGIN));
                let mut attempted = 0u32;
                let mut failures = 0u32;
                let mut last_err = None;

                for i in 0..*pages {
                    if out.len() >= self.cap {
                        break;
                    }
                    if i > 0 {
                        if let Some(d) = deadline {
                            let remaining = d.saturating_duration_since(Instant::now());
                            if !next_page_fits(remaining, *page_delay) {
                                tracing::info!(
                                    target: "ingest",
                                    source = %self.source,
                                    page = i,
                                    remaining_ms = remaining.as_millis() as u64,
                                    "fetch budget spent; skipping remaining pages"
                                );
                                break;
                            }
                        }
                        if !page_delay.is_zero() {
                            let base = page_delay.as_millis() as u64;
                            let jitter = rand::rng().random_range(0..=base);
                            tokio::time::sleep(Duration::from_millis(base + jitter)).await;
                        }
                    }

                    let url = template.replace("{page}", &(table.first_page + i).to_string());
                    let timeout = deadline.map(|d| d.saturating_duration_since(Instant::now()));
                    attempted += 1;
                    match Self::fetch_page(client, &url, timeout).await {
                        Ok(body) => {
                            let got = platform::extract(&body, set, self.cap - out.len());
                            if got.is_empty() {
                                tracing::info!(target: "ingest", source = %self.source, %url, "no listings matched on page");
                            }
                            out.extend(got);
                        }
                        Err(e) => {
                            tracing::warn!(target: "ingest", source = %self.source, error = ?e, "listing page failed");
                            failures += 1;
                            last_err = Some(e);
                        }
                    }
                }

                // Every attempted page failing is a source failure, not an empty result.
                if failures == attempted {
                    if let Some(e) = last_err {
                        return Err(e);
                    }
                }
            }
        }

        Ok(out)
    }

    fn name(&self) -> &'static str {
        self.source.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_page_needs_room_for_delay_and_request() {
        let delay = Duration::from_millis(200);
        assert!(next_page_fits(Duration::from_secs(2), delay));
        assert!(next_page_fits(Duration::from_millis(900), delay));
        assert!(!next_page_fits(Duration::from_millis(899), delay));
        assert!(!next_page_fits(Duration::ZERO, Duration::ZERO));
        assert!(next_page_fits(MIN_PAGE_TIME, Duration::ZERO));
    }

    #[test]
    fn budget_and_url_only_apply_to_http_mode() {
        let p = ListingProvider::from_fixture(Source::Amazon, "<html></html>")
            .with_budget(Duration::from_secs(1))
            .with_listing_url("http://127.0.0.1:1/{page}");
        assert!(matches!(p.mode, Mode::Fixture(_)));

        let client = reqwest::Client::new();
        let p = ListingProvider::http(Source::Amazon, client, 2, Duration::ZERO)
            .with_budget(Duration::from_secs(1))
            .with_listing_url("http://127.0.0.1:1/{page}");
        match p.mode {
            Mode::Http {
                budget, listing_url, ..
            } => {
                assert_eq!(budget, Some(Duration::from_secs(1)));
                assert_eq!(listing_url.as_deref(), Some("http://127.0.0.1:1/{page}"));
            }
            Mode::Fixture(_) => panic!("expected http mode"),
        }
    }
}
