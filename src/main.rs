//! Deals feed service: binary entrypoint.
//! Wires configuration, the feed cache and the HTTP router, then hands the
//! router to the Shuttle runtime.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact tracing logs. `FEED_LOG_JSON=1` switches to JSON lines.
fn enable_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ofertas_feed=info,ingest=info,cache=info,api=info,warn"));

    let json = std::env::var("FEED_LOG_JSON").ok().is_some_and(|v| v == "1");
    let registry = tracing_subscriber::registry().with(filter);
    // The runtime may already have installed a subscriber.
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_tracing();

    let router = ofertas_feed::app().await?;

    Ok(router.into())
}
