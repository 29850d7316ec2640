//! Which marketplaces get scraped.
//!
//! The list lives in a small file, either TOML (`sources = ["shopee", ...]`)
//! or JSON (a bare array, or `{"sources": [...]}`).

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::ingest::types::Source;

pub const ENV_SOURCES_PATH: &str = "FEED_SOURCES_PATH";

/// Looked up relative to the working directory when the env var is unset.
const SEARCH_PATH: [&str; 2] = ["config/sources.toml", "config/sources.json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    /// By extension, else by the first significant character.
    fn detect(path: &Path, text: &str) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(e) if e.eq_ignore_ascii_case("toml") => Format::Toml,
            Some(e) if e.eq_ignore_ascii_case("json") => Format::Json,
            _ => match text.trim_start().chars().next() {
                Some('[') | Some('{') => Format::Json,
                _ => Format::Toml,
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SourcesFile {
    Table { sources: Vec<String> },
    List(Vec<String>),
}

impl SourcesFile {
    fn parse(text: &str, format: Format) -> Result<Self> {
        Ok(match format {
            Format::Toml => toml::from_str(text).context("parsing TOML source list")?,
            Format::Json => serde_json::from_str(text).context("parsing JSON source list")?,
        })
    }

    fn into_names(self) -> Vec<String> {
        match self {
            SourcesFile::Table { sources } | SourcesFile::List(sources) => sources,
        }
    }
}

/// Known sources named in `names`, deduplicated, in canonical order.
/// Blank entries are skipped; unknown ones are logged and skipped.
fn resolve(names: &[String]) -> Vec<Source> {
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .filter_map(|n| match n.parse::<Source>() {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!(target: "ingest", error = %e, "ignoring configured source");
                None
            }
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Read one source list file.
pub fn read_sources_file(path: &Path) -> Result<Vec<Source>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let file = SourcesFile::parse(&text, Format::detect(path, &text))
        .with_context(|| format!("in {}", path.display()))?;
    Ok(resolve(&file.into_names()))
}

/// `$FEED_SOURCES_PATH` if set (it must exist), else the first file on the
/// search path, else every built-in source.
pub fn resolve_sources() -> Result<Vec<Source>> {
    if let Some(p) = std::env::var_os(ENV_SOURCES_PATH) {
        return read_sources_file(Path::new(&p));
    }
    match SEARCH_PATH.iter().map(Path::new).find(|p| p.exists()) {
        Some(p) => read_sources_file(p),
        None => Ok(Source::ALL.to_vec()),
    }
}
