// src/ingest/types.rs
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

/// One upstream marketplace.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Shopee,
    MercadoLivre,
    Amazon,
    Magalu,
}

impl Source {
    pub const ALL: [Source; 4] = [
        Source::Shopee,
        Source::MercadoLivre,
        Source::Amazon,
        Source::Magalu,
    ];

    /// Wire name used in JSON and on `/platform/{name}`.
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Shopee => "shopee",
            Source::MercadoLivre => "mercadolivre",
            Source::Amazon => "amazon",
            Source::Magalu => "magalu",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Source::Shopee => "Shopee",
            Source::MercadoLivre => "Mercado Livre",
            Source::Amazon => "Amazon",
            Source::Magalu => "Magalu",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "shopee" => Ok(Source::Shopee),
            "mercadolivre" | "ml" => Ok(Source::MercadoLivre),
            "amazon" => Ok(Source::Amazon),
            "magalu" | "magazineluiza" => Ok(Source::Magalu),
            _ => Err(anyhow!("unknown source '{s}'")),
        }
    }
}

/// One normalized product listing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub title: String,
    pub price: String,
    pub image: String,
    pub url: String,
    #[serde(default)]
    pub discount: String,
    pub source: Source,
    pub fetched_at: DateTime<Utc>,
}

/// A live contributor to the feed: one listing site or an external snapshot.
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Record>>;
    fn name(&self) -> &'static str;
}
