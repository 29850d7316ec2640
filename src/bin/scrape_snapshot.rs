//! One-shot scrape: run the feed pipeline once and write the result as a
//! JSON snapshot that `FEED_SNAPSHOT_URL` deployments can serve.
//!
//! Usage: `scrape-snapshot [OUT_PATH]` (default `products.json`).

use std::path::PathBuf;

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ofertas_feed::snapshot::write_snapshot;
use ofertas_feed::{FeedConfig, FeedPipeline};

const DEFAULT_OUT: &str = "products.json";

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().compact())
        .init();

    let out = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT));

    let mut cfg = FeedConfig::from_env();
    // A snapshot must not be built from another snapshot.
    cfg.snapshot_url = None;

    let pipeline = FeedPipeline::from_config(&cfg)?;
    let feed = pipeline.build().await;
    write_snapshot(&feed, &out)?;

    tracing::info!(
        path = %out.display(),
        total = feed.total_count,
        origin = %feed.origin,
        platforms = ?feed.counts_by_source,
        "snapshot written"
    );
    Ok(())
}
