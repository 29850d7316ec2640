// src/ingest/field.rs
//! Field extraction cascade: first plausible value wins.

use scraper::ElementRef;

use crate::ingest::locators::{Locator, Target};

/// Title candidates this short are decorative fragments ("-50%", "Novo").
pub const TITLE_MIN_CHARS: usize = 5;

/// Semantic role of a field; controls the plausibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    Title,
    Other,
}

impl FieldRole {
    fn accepts(self, value: &str) -> bool {
        match self {
            FieldRole::Title => value.chars().count() > TITLE_MIN_CHARS,
            FieldRole::Other => !value.is_empty(),
        }
    }
}

/// Try each locator in order and return the first plausible value, or an
/// empty string when none matches. Never fails.
pub fn extract(block: ElementRef<'_>, locators: &[Locator], role: FieldRole) -> String {
    locators
        .iter()
        .find_map(|loc| first_value(block, loc, role))
        .unwrap_or_default()
}

/// The block itself is a candidate too: some cards are the `<a>` element.
fn first_value(block: ElementRef<'_>, loc: &Locator, role: FieldRole) -> Option<String> {
    let own = Some(block).filter(|b| loc.selector.matches(b));
    own.into_iter().chain(block.select(&loc.selector)).find_map(|el| {
        let value = match loc.target {
            Target::Text => collapse_ws(&el.text().collect::<String>()),
            Target::Attr(name) => el.value().attr(name).unwrap_or_default().trim().to_string(),
        };
        role.accepts(&value).then_some(value)
    })
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
