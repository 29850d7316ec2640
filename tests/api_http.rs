// tests/api_http.rs
//
// HTTP-level tests for the public Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot, over a
// pipeline built from fixture listings.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use ofertas_feed::affiliate::AffiliateRewriter;
use ofertas_feed::aggregate::Aggregator;
use ofertas_feed::api::{self, AppState, CACHE_HEADER};
use ofertas_feed::ingest::providers::listing::ListingProvider;
use ofertas_feed::ingest::providers::snapshot::SnapshotProvider;
use ofertas_feed::ingest::types::SourceProvider;
use ofertas_feed::{FeedCache, FeedPipeline, Source};

const BODY_LIMIT: usize = 1024 * 1024;

fn fixture_pipeline() -> FeedPipeline {
    let providers: Vec<Arc<dyn SourceProvider>> = vec![
        Arc::new(ListingProvider::from_fixture(
            Source::Shopee,
            include_str!("fixtures/shopee.html"),
        )),
        Arc::new(ListingProvider::from_fixture(
            Source::MercadoLivre,
            include_str!("fixtures/mercadolivre.html"),
        )),
        Arc::new(ListingProvider::from_fixture(
            Source::Amazon,
            include_str!("fixtures/amazon.html"),
        )),
        Arc::new(ListingProvider::from_fixture(
            Source::Magalu,
            include_str!("fixtures/magalu.html"),
        )),
    ];
    FeedPipeline::new(
        providers,
        AffiliateRewriter::default(),
        Aggregator::with_seed(8, 50, 3),
        Duration::from_secs(2),
    )
}

fn router_over(pipeline: FeedPipeline) -> Router {
    let cache = FeedCache::new(
        Arc::new(pipeline),
        Duration::from_secs(60),
        Duration::from_secs(240),
    );
    api::router(AppState::new(cache))
}

fn test_router() -> Router {
    router_over(fixture_pipeline())
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Option<String>, Json) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let cache = resp
        .headers()
        .get(CACHE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, cache, json)
}

#[tokio::test]
async fn health_returns_ok() {
    let app = test_router();
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap(), "ok");
}

#[tokio::test]
async fn feed_body_shape_and_cache_header() {
    let app = test_router();

    let (status, cache, body) = send(&app, "GET", "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache.as_deref(), Some("MISS"));

    let products = body["products"].as_array().expect("products array");
    assert_eq!(products.len(), 10);
    assert_eq!(body["totalProducts"], 10);
    assert_eq!(body["source"], "live");
    assert_eq!(body["hasAffiliateShopee"], true);
    assert_eq!(body["platforms"]["shopee"], 3);
    assert_eq!(body["platforms"]["mercadolivre"], 3);
    assert!(body["lastUpdate"].as_str().is_some_and(|s| !s.is_empty()));

    let first = &products[0];
    for key in ["title", "price", "image", "url", "discount", "source", "fetchedAt"] {
        assert!(first.get(key).is_some(), "record missing {key}");
    }

    let (_, cache2, body2) = send(&app, "GET", "/produtos").await;
    assert_eq!(cache2.as_deref(), Some("HIT"));
    assert_eq!(body2, body);
}

#[tokio::test]
async fn search_matches_title_case_insensitively() {
    let app = test_router();
    let (status, _, body) = send(&app, "GET", "/search?q=SMART").await;
    assert_eq!(status, StatusCode::OK);

    let titles: Vec<&str> = body["products"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["title"].as_str())
        .collect();
    assert_eq!(titles.len(), 2, "{titles:?}");
    assert!(titles.iter().all(|t| t.to_lowercase().contains("smart")));
    assert_eq!(body["totalProducts"], 2);
    assert_eq!(body["source"], "live");
}

#[tokio::test]
async fn search_matches_source_name() {
    let app = test_router();
    let (_, _, body) = send(&app, "GET", "/search?q=magalu").await;
    assert_eq!(body["totalProducts"], 2);
    assert_eq!(body["platforms"]["magalu"], 2);
}

#[tokio::test]
async fn search_rejects_short_or_missing_query() {
    let app = test_router();
    for uri in ["/search?q=a", "/search?q=%20%20", "/search"] {
        let (status, _, body) = send(&app, "GET", uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].as_str().is_some());
        assert_eq!(body["products"], Json::Array(vec![]));
        assert_eq!(body["totalProducts"], 0);
    }
}

#[tokio::test]
async fn platform_filter_and_unknown_platform() {
    let app = test_router();

    let (status, _, body) = send(&app, "GET", "/platform/amazon").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalProducts"], 2);
    assert!(body["products"]
        .as_array()
        .unwrap()
        .iter()
        .all(|p| p["source"] == "amazon"));
    assert_eq!(body["hasAffiliateShopee"], false);

    let (_, _, ml) = send(&app, "GET", "/platform/Mercado-Livre").await;
    assert_eq!(ml["totalProducts"], 3);

    let (status, _, none) = send(&app, "GET", "/platform/ebay").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(none["totalProducts"], 0);
    assert_eq!(none["products"], Json::Array(vec![]));
}

#[tokio::test]
async fn clear_cache_forces_rebuild() {
    let app = test_router();
    let (_, first, _) = send(&app, "GET", "/").await;
    assert_eq!(first.as_deref(), Some("MISS"));

    let (status, _, body) = send(&app, "POST", "/cache/clear").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared"], true);

    let (_, after, _) = send(&app, "GET", "/").await;
    assert_eq!(after.as_deref(), Some("MISS"));
}

#[tokio::test]
async fn diagnostics_route_reports_version_and_cache() {
    let app = test_router();
    let (status, _, body) = send(&app, "GET", "/test").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["timestamp"].as_str().is_some());
    assert_eq!(body["cache"]["populated"], false);
    assert_eq!(body["providers"].as_array().map(Vec::len), Some(4));
    assert!(body["snapshotUrl"].is_null());
}

#[tokio::test]
async fn check_json_without_snapshot_url_reports_unconfigured() {
    let app = test_router();
    let (status, _, body) = send(&app, "GET", "/check-json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["configured"], false);
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap().contains("FEED_SNAPSHOT_URL"));
}

#[tokio::test]
async fn check_json_reports_snapshot_products() {
    let snapshot = SnapshotProvider::from_fixture(include_str!("fixtures/snapshot.json"));
    let app = router_over(fixture_pipeline().with_snapshot(snapshot));

    let (status, _, body) = send(&app, "GET", "/check-json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["configured"], true);
    assert_eq!(body["ok"], true);
    assert_eq!(body["totalProducts"], 3);

    let (_, _, diag) = send(&app, "GET", "/test").await;
    assert_eq!(diag["snapshotUrl"], "fixture");
    assert_eq!(diag["providers"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn check_json_reports_upstream_http_status() {
    let upstream = Router::new().route(
        "/products.json",
        axum::routing::get(|| async {
            (
                [(axum::http::header::CONTENT_TYPE, "application/json")],
                include_str!("fixtures/snapshot.json"),
            )
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });

    let client = reqwest::Client::new();
    let good = format!("http://{addr}/products.json");
    let app = router_over(
        fixture_pipeline().with_snapshot(SnapshotProvider::from_url(good.clone(), client.clone())),
    );
    let (_, _, body) = send(&app, "GET", "/check-json").await;
    assert_eq!(body["url"], good.as_str());
    assert_eq!(body["ok"], true);
    assert_eq!(body["status"], 200);
    assert_eq!(body["contentType"], "application/json");
    assert_eq!(body["totalProducts"], 3);

    let missing = format!("http://{addr}/gone.json");
    let app = router_over(
        fixture_pipeline().with_snapshot(SnapshotProvider::from_url(missing, client)),
    );
    let (status, _, body) = send(&app, "GET", "/check-json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], false);
    assert_eq!(body["status"], 404);
    assert_eq!(body["statusText"], "Not Found");
    assert!(body["totalProducts"].is_null());
}

#[tokio::test]
async fn unknown_route_lists_available_routes() {
    let app = test_router();
    let (status, _, body) = send(&app, "GET", "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let routes = body["availableRoutes"].as_array().expect("routes");
    assert!(routes.iter().any(|r| r == "GET /produtos"));
    assert!(routes.iter().any(|r| r == "GET /check-json"));
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let app = test_router();
    let req = Request::builder()
        .uri("/health")
        .header("origin", "https://ofertas.example")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert!(resp
        .headers()
        .contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn metrics_route_is_exposed() {
    let app = test_router();
    send(&app, "GET", "/").await;
    let req = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
