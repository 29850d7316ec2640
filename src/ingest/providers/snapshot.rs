// src/ingest/providers/snapshot.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use crate::ingest::types::{Record, Source, SourceProvider};
use crate::snapshot::parse_snapshot;

/// Reachability report for the snapshot URL, served on `/check-json`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotCheck {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_products: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SnapshotCheck {
    pub fn unconfigured() -> Self {
        Self {
            error: Some("FEED_SNAPSHOT_URL is not set".into()),
            ..Self::default()
        }
    }
}

/// Reads an externally hosted feed snapshot (e.g. a `products.json` on a raw
/// content host) and contributes its products as live records.
pub struct SnapshotProvider {
    default_source: Source,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl SnapshotProvider {
    pub fn from_fixture(json: &str) -> Self {
        Self {
            default_source: Source::Shopee,
            mode: Mode::Fixture(json.to_string()),
        }
    }

    pub fn from_url(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            default_source: Source::Shopee,
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        }
    }

    pub fn with_default_source(mut self, source: Source) -> Self {
        self.default_source = source;
        self
    }

    fn parse(&self, body: &str) -> Result<Vec<Record>> {
        let doc = parse_snapshot(body)?;
        Ok(doc.into_records(self.default_source))
    }

    pub fn location(&self) -> &str {
        match &self.mode {
            Mode::Fixture(_) => "fixture",
            Mode::Http { url, .. } => url,
        }
    }

    /// Fetch the snapshot once and report what came back. Never fails;
    /// problems are reported in the result.
    pub async fn check(&self) -> SnapshotCheck {
        let mut report = SnapshotCheck {
            configured: true,
            url: Some(self.location().to_string()),
            ..SnapshotCheck::default()
        };

        let body = match &self.mode {
            Mode::Fixture(s) => s.clone(),
            Mode::Http { url, client } => {
                let resp = match client.get(url.as_str()).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!(target: "ingest", %url, error = ?e, "snapshot check failed");
                        report.error = Some(e.to_string());
                        return report;
                    }
                };
                let status = resp.status();
                report.status = Some(status.as_u16());
                report.status_text = status.canonical_reason().map(str::to_string);
                report.content_type = resp
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                if !status.is_success() {
                    report.error = Some(format!("HTTP {status}"));
                    return report;
                }
                match resp.text().await {
                    Ok(b) => b,
                    Err(e) => {
                        report.error = Some(e.to_string());
                        return report;
                    }
                }
            }
        };

        match self.parse(&body) {
            Ok(records) => {
                report.ok = true;
                report.total_products = Some(records.len());
            }
            Err(e) => report.error = Some(format!("{e:#}")),
        }
        report
    }
}

#[async_trait]
impl SourceProvider for SnapshotProvider {
    async fn fetch_latest(&self) -> Result<Vec<Record>> {
        match &self.mode {
            Mode::Fixture(s) => self.parse(s),
            Mode::Http { url, client } => {
                let resp = client
                    .get(url.as_str())
                    .send()
                    .await
                    .context("snapshot http get()")?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(anyhow!("snapshot {url} returned HTTP {status}"));
                }
                let body = resp.text().await.context("snapshot http .text()")?;
                self.parse(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "snapshot"
    }
}
