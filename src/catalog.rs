//! Static example listings served when live extraction comes up short.

use chrono::Utc;

use crate::affiliate::AffiliateRewriter;
use crate::ingest::types::{Record, Source};

struct Entry {
    source: Source,
    title: &'static str,
    price: &'static str,
    image_text: &'static str,
    url: &'static str,
    discount: &'static str,
}

const ENTRIES: &[Entry] = &[
    Entry {
        source: Source::Shopee,
        title: "Smartphone Android 128GB Tela 6.5",
        price: "R$ 899,90",
        image_text: "Smartphone",
        url: "https://shopee.com.br/search?keyword=smartphone",
        discount: "50% OFF",
    },
    Entry {
        source: Source::Shopee,
        title: "Fone de Ouvido Bluetooth TWS",
        price: "R$ 89,90",
        image_text: "Fone",
        url: "https://shopee.com.br/search?keyword=fone%20bluetooth",
        discount: "30% OFF",
    },
    Entry {
        source: Source::Shopee,
        title: "Power Bank 10000mAh Carregamento Rapido",
        price: "R$ 45,90",
        image_text: "Power+Bank",
        url: "https://shopee.com.br/search?keyword=power%20bank",
        discount: "25% OFF",
    },
    Entry {
        source: Source::MercadoLivre,
        title: "Smart TV 43 Full HD Wi-Fi",
        price: "R$ 1.599,00",
        image_text: "Smart+TV",
        url: "https://www.mercadolivre.com.br/ofertas",
        discount: "20% OFF",
    },
    Entry {
        source: Source::MercadoLivre,
        title: "Air Fryer 4L Antiaderente 110V",
        price: "R$ 279,90",
        image_text: "Air+Fryer",
        url: "https://www.mercadolivre.com.br/ofertas",
        discount: "35% OFF",
    },
    Entry {
        source: Source::MercadoLivre,
        title: "Kit Ferramentas 129 Pecas com Maleta",
        price: "R$ 119,90",
        image_text: "Ferramentas",
        url: "https://www.mercadolivre.com.br/ofertas",
        discount: "",
    },
    Entry {
        source: Source::Amazon,
        title: "Echo Dot 5a Geracao com Alexa",
        price: "R$ 299,00",
        image_text: "Echo+Dot",
        url: "https://www.amazon.com.br/deals",
        discount: "40% OFF",
    },
    Entry {
        source: Source::Amazon,
        title: "Kindle 16GB Tela Antirreflexo",
        price: "R$ 474,05",
        image_text: "Kindle",
        url: "https://www.amazon.com.br/deals",
        discount: "15% OFF",
    },
    Entry {
        source: Source::Amazon,
        title: "Mouse Sem Fio Ergonomico 2.4GHz",
        price: "R$ 59,90",
        image_text: "Mouse",
        url: "https://www.amazon.com.br/deals",
        discount: "",
    },
    Entry {
        source: Source::Magalu,
        title: "Geladeira Frost Free 375L Inox",
        price: "R$ 2.899,00",
        image_text: "Geladeira",
        url: "https://www.magazineluiza.com.br/selecao/ofertasdodia/",
        discount: "18% OFF",
    },
    Entry {
        source: Source::Magalu,
        title: "Notebook 15.6 Intel Core i5 8GB SSD 256GB",
        price: "R$ 2.999,00",
        image_text: "Notebook",
        url: "https://www.magazineluiza.com.br/selecao/ofertasdodia/",
        discount: "22% OFF",
    },
    Entry {
        source: Source::Magalu,
        title: "Liquidificador 1200W 12 Velocidades",
        price: "R$ 149,90",
        image_text: "Liquidificador",
        url: "https://www.magazineluiza.com.br/selecao/ofertasdodia/",
        discount: "",
    },
];

/// Immutable fallback records, affiliate-rewritten once at construction.
#[derive(Debug, Clone)]
pub struct FallbackCatalog {
    records: Vec<Record>,
}

impl FallbackCatalog {
    pub fn new(rewriter: &AffiliateRewriter) -> Self {
        Self::from_records(builtin_records(), rewriter)
    }

    /// Build from arbitrary records (tests, custom deployments).
    pub fn from_records(records: Vec<Record>, rewriter: &AffiliateRewriter) -> Self {
        Self {
            records: rewriter.rewrite_all(records),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn for_source(&self, source: Source) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(move |r| r.source == source)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn builtin_records() -> Vec<Record> {
    let now = Utc::now();
    ENTRIES
        .iter()
        .map(|e| Record {
            title: e.title.to_string(),
            price: e.price.to_string(),
            image: format!("https://via.placeholder.com/200x200?text={}", e.image_text),
            url: e.url.to_string(),
            discount: e.discount.to_string(),
            source: e.source,
            fetched_at: now,
        })
        .collect()
}
