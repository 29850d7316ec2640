// src/ingest/normalize.rs
//! Cleaning rules that turn scraped fragments into record fields.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::ingest::field::TITLE_MIN_CHARS;
use crate::ingest::types::Source;

pub const TITLE_MAX_CHARS: usize = 100;
pub const PRICE_INQUIRE: &str = "Consulte o preço";

const CURRENCY_MARKERS: [&str; 4] = ["US$", "R$", "€", "$"];

static RE_TITLE_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s()\[\]/+&]").expect("title noise regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static RE_PRICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(US\$|R\$|€|\$)?\s*(\d[\d.,]*)").expect("price regex")
});
static RE_DISCOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\d+|%|-|\boff\b").expect("discount regex"));

/// Decode entities, strip disallowed characters, collapse whitespace and cap
/// at 100 chars. `None` when the result is too short to be a real title.
pub fn clean_title(raw: &str) -> Option<String> {
    let decoded = html_escape::decode_html_entities(raw);
    let stripped = RE_TITLE_NOISE.replace_all(&decoded, " ");
    let collapsed = RE_WS.replace_all(&stripped, " ");
    let capped: String = collapsed.trim().chars().take(TITLE_MAX_CHARS).collect();
    let out = capped.trim_end().to_string();
    (out.chars().count() > TITLE_MIN_CHARS).then_some(out)
}

/// Keep the leading currency/number group, drop trailing noise such as
/// "(parcelado)" or "em 10x", and render as `<currency> <amount>`.
pub fn clean_price(raw: &str, default_currency: &str) -> String {
    let Some(caps) = RE_PRICE.captures(raw) else {
        return PRICE_INQUIRE.to_string();
    };
    let amount = caps[2].trim_end_matches(['.', ',']);
    if amount.is_empty() {
        return PRICE_INQUIRE.to_string();
    }
    let currency = caps
        .get(1)
        .map(|m| m.as_str())
        .or_else(|| CURRENCY_MARKERS.iter().copied().find(|m| raw.contains(m)))
        .unwrap_or(default_currency);
    format!("{currency} {amount}")
}

/// Reduce a discount badge to digits, `%`, `-` and `OFF`.
/// Empty in, empty out; badges without any digit are treated as absent.
pub fn clean_discount(raw: &str) -> String {
    if !raw.chars().any(|c| c.is_ascii_digit()) {
        return String::new();
    }
    let mut out = String::new();
    for m in RE_DISCOUNT.find_iter(raw) {
        let tok = m.as_str();
        if tok.eq_ignore_ascii_case("off") {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str("OFF");
        } else {
            out.push_str(tok);
        }
    }
    out
}

/// Make a scraped href/src absolute against the source base URL.
pub fn resolve_url(value: &str, base_url: &str) -> String {
    let v = value.trim();
    if v.is_empty() {
        return String::new();
    }
    let base = base_url.trim_end_matches('/');
    if let Some(rest) = v.strip_prefix("//") {
        format!("https://{rest}")
    } else if v.starts_with('/') {
        format!("{base}{v}")
    } else if has_scheme(v) {
        v.to_string()
    } else {
        format!("{base}/{v}")
    }
}

/// Like [`resolve_url`], but a missing image becomes the source placeholder.
pub fn resolve_image(value: &str, source: Source, base_url: &str) -> String {
    let resolved = resolve_url(value, base_url);
    if resolved.is_empty() {
        placeholder_image(source)
    } else {
        resolved
    }
}

/// Deterministic placeholder keyed by source.
pub fn placeholder_image(source: Source) -> String {
    format!(
        "https://via.placeholder.com/200x200?text={}",
        source.display_name().replace(' ', "+")
    )
}

/// Absolute http(s) URL with a host.
pub fn is_absolute_http(value: &str) -> bool {
    Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

fn has_scheme(v: &str) -> bool {
    match v.split_once(':') {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_strips_noise_and_caps_length() {
        assert_eq!(
            clean_title("  Fone&nbsp;Bluetooth • TWS (Preto) *** ").as_deref(),
            Some("Fone Bluetooth TWS (Preto)")
        );
        let long = "a".repeat(150);
        assert_eq!(clean_title(&long).unwrap().chars().count(), TITLE_MAX_CHARS);
        assert_eq!(clean_title("-50%!"), None);
        assert_eq!(clean_title("Novo"), None);
    }

    #[test]
    fn title_keeps_accents_and_allowed_symbols() {
        assert_eq!(
            clean_title("Cafeteira Elétrica 110V/220V + Jarra & Filtro [Kit]").as_deref(),
            Some("Cafeteira Elétrica 110V/220V + Jarra & Filtro [Kit]")
        );
    }

    #[test]
    fn price_examples() {
        assert_eq!(clean_price("R$1.299,90 (parcelado)", "R$"), "R$ 1.299,90");
        assert_eq!(clean_price("", "R$"), PRICE_INQUIRE);
        assert_eq!(clean_price("89,90", "R$"), "R$ 89,90");
        assert_eq!(clean_price("R$ 45,90 em 10x sem juros", "R$"), "R$ 45,90");
        assert_eq!(clean_price("sob consulta", "R$"), PRICE_INQUIRE);
    }

    #[test]
    fn discount_keeps_markers_only() {
        assert_eq!(clean_discount("25% OFF"), "25% OFF");
        assert_eq!(clean_discount("-30 %"), "-30%");
        assert_eq!(clean_discount("Desconto de 10% off"), "10% OFF");
        assert_eq!(clean_discount(""), "");
        assert_eq!(clean_discount("OFERTA"), "");
    }

    #[test]
    fn url_resolution_rules() {
        let base = "https://x.example";
        assert_eq!(resolve_url("/produto/123", base), "https://x.example/produto/123");
        assert_eq!(resolve_url("//cdn.example/a.jpg", base), "https://cdn.example/a.jpg");
        assert_eq!(resolve_url("produto/9", base), "https://x.example/produto/9");
        assert_eq!(resolve_url("https://y.example/p", base), "https://y.example/p");
        assert_eq!(resolve_url("  ", base), "");
    }

    #[test]
    fn missing_image_gets_source_placeholder() {
        let img = resolve_image("", Source::MercadoLivre, "https://www.mercadolivre.com.br");
        assert_eq!(img, "https://via.placeholder.com/200x200?text=Mercado+Livre");
        assert_eq!(img, placeholder_image(Source::MercadoLivre));
    }
}
