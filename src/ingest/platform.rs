// src/ingest/platform.rs
//! Per-source extraction: container cascade + field cascade + cleaning.

use chrono::Utc;
use scraper::{ElementRef, Html};

use crate::ingest::field::{self, FieldRole};
use crate::ingest::locators::SourceLocatorSet;
use crate::ingest::normalize;
use crate::ingest::types::Record;

/// Default upper bound on records taken from one source per refresh.
pub const DEFAULT_PER_SOURCE_CAP: usize = 15;

/// Extract up to `cap` records from one listing document.
///
/// Container locators are tried in priority order; the first one whose matches
/// yield at least one accepted record wins and later locators are not tried.
/// No match at all is a normal outcome and returns an empty vector.
pub fn extract(document: &str, set: &SourceLocatorSet, cap: usize) -> Vec<Record> {
    if cap == 0 {
        return Vec::new();
    }
    let html = Html::parse_document(document);

    for (raw, container) in &set.containers {
        let mut matched = 0usize;
        let mut out = Vec::new();
        for block in html.select(container) {
            matched += 1;
            if out.len() >= cap {
                break;
            }
            if let Some(rec) = build_record(block, set) {
                out.push(rec);
            }
        }

        if matched == 0 {
            continue;
        }
        tracing::debug!(
            target: "ingest",
            source = %set.source,
            selector = *raw,
            matched,
            accepted = out.len(),
            "container locator matched"
        );
        if !out.is_empty() {
            return out;
        }
    }

    Vec::new()
}

/// Field cascade + cleaning + acceptance gate for one container element.
fn build_record(block: ElementRef<'_>, set: &SourceLocatorSet) -> Option<Record> {
    let title = normalize::clean_title(&field::extract(block, &set.title, FieldRole::Title))?;

    let url = normalize::resolve_url(
        &field::extract(block, &set.url, FieldRole::Other),
        set.base_url,
    );
    if !normalize::is_absolute_http(&url) {
        return None;
    }

    let price = normalize::clean_price(
        &field::extract(block, &set.price, FieldRole::Other),
        set.currency,
    );
    let image = normalize::resolve_image(
        &field::extract(block, &set.image, FieldRole::Other),
        set.source,
        set.base_url,
    );
    let discount = normalize::clean_discount(&field::extract(block, &set.discount, FieldRole::Other));

    Some(Record {
        title,
        price,
        image,
        url,
        discount,
        source: set.source,
        fetched_at: Utc::now(),
    })
}
