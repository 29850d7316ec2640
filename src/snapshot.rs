//! Flat JSON snapshot of a feed, written by the scrape job and readable as a
//! live source.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feed::Feed;
use crate::ingest::normalize;
use crate::ingest::types::{Record, Source};

/// Wire format. Field names are shared with the HTTP feed body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDoc {
    #[serde(default)]
    pub last_update: String,
    #[serde(default)]
    pub products: Vec<SnapshotProduct>,
    #[serde(default)]
    pub total_products: usize,
    #[serde(default)]
    pub scraped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub platforms: BTreeMap<String, usize>,
    #[serde(default)]
    pub has_affiliate_shopee: bool,
}

/// Record shape as found in snapshots; older snapshots omit `source`/`fetchedAt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotProduct {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub discount: String,
    #[serde(default, alias = "platform")]
    pub source: Option<String>,
    #[serde(default)]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl SnapshotDoc {
    pub fn from_feed(feed: &Feed) -> Self {
        Self {
            last_update: feed.last_update.clone(),
            products: feed
                .records
                .iter()
                .map(|r| SnapshotProduct {
                    title: r.title.clone(),
                    price: r.price.clone(),
                    image: r.image.clone(),
                    url: r.url.clone(),
                    discount: r.discount.clone(),
                    source: Some(r.source.as_str().to_string()),
                    fetched_at: Some(r.fetched_at),
                })
                .collect(),
            total_products: feed.total_count,
            scraped_at: Some(feed.generated_at),
            platforms: feed
                .counts_by_source
                .iter()
                .map(|(s, n)| (s.as_str().to_string(), *n))
                .collect(),
            has_affiliate_shopee: feed.has_affiliate,
        }
    }

    /// Convert to records, dropping entries that fail the title/url gate.
    /// Untagged or unknown-source products are attributed to `default_source`.
    pub fn into_records(self, default_source: Source) -> Vec<Record> {
        let fallback_ts = self.scraped_at.unwrap_or_else(Utc::now);
        self.products
            .into_iter()
            .filter_map(|p| {
                let source = p
                    .source
                    .as_deref()
                    .and_then(|s| s.parse::<Source>().ok())
                    .unwrap_or(default_source);
                let title = normalize::clean_title(&p.title)?;
                let url = p.url.trim().to_string();
                if !normalize::is_absolute_http(&url) {
                    return None;
                }
                let image = if p.image.trim().is_empty() {
                    normalize::placeholder_image(source)
                } else {
                    p.image
                };
                let price = if p.price.trim().is_empty() {
                    normalize::PRICE_INQUIRE.to_string()
                } else {
                    p.price
                };
                Some(Record {
                    title,
                    price,
                    image,
                    url,
                    discount: p.discount,
                    source,
                    fetched_at: p.fetched_at.unwrap_or(fallback_ts),
                })
            })
            .collect()
    }
}

pub fn parse_snapshot(s: &str) -> Result<SnapshotDoc> {
    serde_json::from_str(s).context("parsing feed snapshot json")
}

/// Write the snapshot atomically (temp file + rename).
pub fn write_snapshot(feed: &Feed, path: &Path) -> Result<()> {
    let doc = SnapshotDoc::from_feed(feed);
    let json = serde_json::to_string_pretty(&doc).context("serializing snapshot")?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("renaming into {}", path.display()))?;
    Ok(())
}

pub fn read_snapshot(path: &Path) -> Result<SnapshotDoc> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot from {}", path.display()))?;
    parse_snapshot(&s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_snapshot_without_source_defaults_to_shopee() {
        let raw = r#"{
            "lastUpdate": "sexta-feira, 10 de outubro de 2025 às 10:00:00",
            "products": [
                {"title": "Produto Exemplo 1 - Smartphone Android", "price": "R$ 299,90",
                 "image": "https://via.placeholder.com/200x200?text=Smartphone",
                 "url": "https://shopee.com.br", "discount": "50% OFF"},
                {"title": "x", "price": "", "image": "", "url": "https://shopee.com.br"},
                {"title": "Sem link valido aqui", "price": "", "image": "", "url": "/relativo"}
            ],
            "totalProducts": 3
        }"#;
        let recs = parse_snapshot(raw).unwrap().into_records(Source::Shopee);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].source, Source::Shopee);
        assert_eq!(recs[0].title, "Produto Exemplo 1 Smartphone Android");
    }

    #[test]
    fn tagged_products_keep_their_source() {
        let raw = r#"{"products":[{"title":"Kindle 16GB Tela","price":"R$ 474,05","image":"",
            "url":"https://www.amazon.com.br/deals","source":"amazon"}]}"#;
        let recs = parse_snapshot(raw).unwrap().into_records(Source::Shopee);
        assert_eq!(recs[0].source, Source::Amazon);
        assert_eq!(recs[0].image, normalize::placeholder_image(Source::Amazon));
    }
}
