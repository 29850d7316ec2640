// src/ingest/locators.rs
//! Declarative locator tables, one per source.
//!
//! Markup changes upstream are handled here, not in code: add a locator to
//! the right list (most specific first) and the extraction cascade picks it up.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use scraper::Selector;

use crate::ingest::types::Source;

/// Where a field's value lives inside a matched element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Text,
    Attr(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct LocatorSpec {
    pub selector: &'static str,
    pub target: Target,
}

const fn text(selector: &'static str) -> LocatorSpec {
    LocatorSpec {
        selector,
        target: Target::Text,
    }
}

const fn attr(selector: &'static str, name: &'static str) -> LocatorSpec {
    LocatorSpec {
        selector,
        target: Target::Attr(name),
    }
}

/// Static description of one source before selector compilation.
#[derive(Debug)]
pub struct SourceTable {
    pub source: Source,
    pub base_url: &'static str,
    /// Listing page template; `{page}` is replaced with the page number.
    pub listing_url: &'static str,
    pub first_page: u32,
    pub currency: &'static str,
    pub containers: &'static [&'static str],
    pub title: &'static [LocatorSpec],
    pub price: &'static [LocatorSpec],
    pub image: &'static [LocatorSpec],
    pub url: &'static [LocatorSpec],
    pub discount: &'static [LocatorSpec],
}

pub static SHOPEE: SourceTable = SourceTable {
    source: Source::Shopee,
    base_url: "https://shopee.com.br",
    listing_url: "https://shopee.com.br/search?keyword=oferta&page={page}",
    first_page: 0,
    currency: "R$",
    containers: &[
        ".shopee-search-item-result__item",
        ".col-xs-2-4",
        "[data-sqe=\"item\"]",
        ".item-card-special",
        ".shopee-item-card",
    ],
    title: &[
        text("[data-sqe=\"name\"]"),
        text("._10Wbs- div"),
        text(".line-clamp-2"),
        attr("img", "alt"),
    ],
    price: &[
        text(".ZEgARZ"),
        text("._3c5u7X"),
        text("[data-sqe=\"price\"]"),
        text(".price"),
    ],
    image: &[attr("img", "src"), attr("img", "data-src")],
    url: &[attr("a[data-sqe=\"link\"]", "href"), attr("a", "href")],
    discount: &[text(".percent"), text("[data-sqe=\"discount\"]")],
};

pub static MERCADO_LIVRE: SourceTable = SourceTable {
    source: Source::MercadoLivre,
    base_url: "https://www.mercadolivre.com.br",
    listing_url: "https://www.mercadolivre.com.br/ofertas?page={page}",
    first_page: 1,
    currency: "R$",
    containers: &[
        ".promotion-item",
        ".poly-card",
        ".ui-search-result__wrapper",
        "li.ui-search-layout__item",
    ],
    title: &[
        text(".promotion-item__title"),
        text(".poly-component__title"),
        text("h2.ui-search-item__title"),
        attr("img", "alt"),
    ],
    price: &[
        text(".promotion-item__price"),
        text(".poly-price__current .andes-money-amount"),
        text(".andes-money-amount"),
    ],
    image: &[attr("img", "data-src"), attr("img", "src")],
    url: &[
        attr("a.promotion-item__link-container", "href"),
        attr("a.poly-component__title", "href"),
        attr("a", "href"),
    ],
    discount: &[
        text(".promotion-item__discount"),
        text(".andes-money-amount__discount"),
        text(".poly-price__disc_label"),
    ],
};

pub static AMAZON: SourceTable = SourceTable {
    source: Source::Amazon,
    base_url: "https://www.amazon.com.br",
    listing_url: "https://www.amazon.com.br/deals?page={page}",
    first_page: 1,
    currency: "R$",
    containers: &[
        "[data-testid=\"product-card\"]",
        "[data-component-type=\"s-search-result\"]",
        ".s-result-item",
    ],
    title: &[
        text("h2 a span"),
        text("[class*=\"ProductCard-module__title\"]"),
        text(".a-truncate-full"),
        attr("img", "alt"),
    ],
    price: &[
        text(".a-price .a-offscreen"),
        text(".a-price-whole"),
        text("[class*=\"price\"]"),
    ],
    image: &[attr("img.s-image", "src"), attr("img", "src")],
    url: &[attr("h2 a", "href"), attr("a", "href")],
    discount: &[
        text("[class*=\"badgeLabel\"]"),
        text(".savingsPercentage"),
        text(".a-badge-text"),
    ],
};

pub static MAGALU: SourceTable = SourceTable {
    source: Source::Magalu,
    base_url: "https://www.magazineluiza.com.br",
    listing_url: "https://www.magazineluiza.com.br/selecao/ofertasdodia/?page={page}",
    first_page: 1,
    currency: "R$",
    containers: &[
        "[data-testid=\"product-card-container\"]",
        "li[data-testid=\"product-list-item\"]",
        ".product-li",
    ],
    title: &[
        text("[data-testid=\"product-title\"]"),
        text("h2"),
        attr("img", "alt"),
    ],
    price: &[
        text("[data-testid=\"price-value\"]"),
        text(".price-template__text"),
    ],
    image: &[attr("img", "src"), attr("img", "data-src")],
    url: &[attr("a[data-testid=\"product-card-container\"]", "href"), attr("a", "href")],
    discount: &[text("[data-testid=\"price-discount\"]"), text(".discount")],
};

pub fn table_for(source: Source) -> &'static SourceTable {
    match source {
        Source::Shopee => &SHOPEE,
        Source::MercadoLivre => &MERCADO_LIVRE,
        Source::Amazon => &AMAZON,
        Source::Magalu => &MAGALU,
    }
}

/// A compiled field locator.
#[derive(Debug)]
pub struct Locator {
    pub raw: &'static str,
    pub selector: Selector,
    pub target: Target,
}

/// Compiled, immutable locator configuration for one source.
#[derive(Debug)]
pub struct SourceLocatorSet {
    pub source: Source,
    pub base_url: &'static str,
    pub currency: &'static str,
    pub containers: Vec<(&'static str, Selector)>,
    pub title: Vec<Locator>,
    pub price: Vec<Locator>,
    pub image: Vec<Locator>,
    pub url: Vec<Locator>,
    pub discount: Vec<Locator>,
}

impl SourceLocatorSet {
    /// Compile a static table. Selectors that fail to parse are dropped with a warning.
    pub fn compile(table: &SourceTable) -> Self {
        let containers = table
            .containers
            .iter()
            .filter_map(|raw| parse_selector(table.source, raw).map(|sel| (*raw, sel)))
            .collect();
        Self {
            source: table.source,
            base_url: table.base_url,
            currency: table.currency,
            containers,
            title: compile_list(table.source, table.title),
            price: compile_list(table.source, table.price),
            image: compile_list(table.source, table.image),
            url: compile_list(table.source, table.url),
            discount: compile_list(table.source, table.discount),
        }
    }

    /// Shared compiled set for a built-in source.
    pub fn for_source(source: Source) -> &'static SourceLocatorSet {
        static SETS: Lazy<HashMap<Source, SourceLocatorSet>> = Lazy::new(|| {
            Source::ALL
                .iter()
                .map(|s| (*s, SourceLocatorSet::compile(table_for(*s))))
                .collect()
        });
        &SETS[&source]
    }
}

fn compile_list(source: Source, specs: &[LocatorSpec]) -> Vec<Locator> {
    specs
        .iter()
        .filter_map(|spec| {
            parse_selector(source, spec.selector).map(|selector| Locator {
                raw: spec.selector,
                selector,
                target: spec.target,
            })
        })
        .collect()
}

fn parse_selector(source: Source, raw: &str) -> Option<Selector> {
    match Selector::parse(raw) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::warn!(target: "ingest", %source, selector = raw, error = ?e, "invalid locator skipped");
            None
        }
    }
}
