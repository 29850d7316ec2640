// tests/snapshot_file.rs
//
// Snapshot written by the scrape job, read back as a live source.

use std::sync::Arc;
use std::time::Duration;

use ofertas_feed::affiliate::AffiliateRewriter;
use ofertas_feed::aggregate::Aggregator;
use ofertas_feed::ingest::providers::listing::ListingProvider;
use ofertas_feed::ingest::providers::snapshot::SnapshotProvider;
use ofertas_feed::ingest::types::SourceProvider;
use ofertas_feed::snapshot::{read_snapshot, write_snapshot};
use ofertas_feed::{FeedPipeline, Source};

async fn live_feed() -> ofertas_feed::Feed {
    let providers: Vec<Arc<dyn SourceProvider>> = vec![
        Arc::new(ListingProvider::from_fixture(
            Source::Shopee,
            include_str!("fixtures/shopee.html"),
        )),
        Arc::new(ListingProvider::from_fixture(
            Source::Amazon,
            include_str!("fixtures/amazon.html"),
        )),
    ];
    FeedPipeline::new(
        providers,
        AffiliateRewriter::default(),
        Aggregator::with_seed(3, 50, 11),
        Duration::from_secs(2),
    )
    .build()
    .await
}

#[tokio::test]
async fn written_snapshot_reads_back_with_same_records() {
    let feed = live_feed().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("products.json");

    write_snapshot(&feed, &path).unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());

    let doc = read_snapshot(&path).unwrap();
    assert_eq!(doc.total_products, feed.total_count);
    assert_eq!(doc.last_update, feed.last_update);
    assert_eq!(doc.has_affiliate_shopee, feed.has_affiliate);
    assert_eq!(doc.platforms.get("shopee"), Some(&3));
    assert_eq!(doc.platforms.get("amazon"), Some(&2));

    let back = doc.into_records(Source::Shopee);
    assert_eq!(back, feed.records);
}

#[tokio::test]
async fn snapshot_file_feeds_the_pipeline_without_double_tagging() {
    let feed = live_feed().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("products.json");
    write_snapshot(&feed, &path).unwrap();

    let json = std::fs::read_to_string(&path).unwrap();
    let rebuilt = FeedPipeline::new(
        vec![Arc::new(SnapshotProvider::from_fixture(&json))],
        AffiliateRewriter::default(),
        Aggregator::with_seed(3, 50, 11),
        Duration::from_secs(2),
    )
    .build()
    .await;

    assert_eq!(rebuilt.total_count, feed.total_count);
    for r in &rebuilt.records {
        assert!(r.url.matches("affiliate_id").count() <= 1, "{}", r.url);
    }
}

#[tokio::test]
async fn unreadable_snapshot_is_a_source_error() {
    let p = SnapshotProvider::from_fixture("not json");
    assert!(p.fetch_latest().await.is_err());
    assert_eq!(p.name(), "snapshot");
}

#[test]
fn fixture_snapshot_gates_products() {
    let doc = ofertas_feed::snapshot::parse_snapshot(include_str!("fixtures/snapshot.json")).unwrap();
    assert_eq!(doc.products.len(), 4);
    let recs = doc.into_records(Source::Shopee);
    assert_eq!(recs.len(), 3, "relative url must be dropped");
    assert_eq!(recs[2].source, Source::Amazon);
    assert_eq!(
        recs[1].image,
        "https://via.placeholder.com/200x200?text=Shopee"
    );
}
