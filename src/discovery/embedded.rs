//! Embedded-state discovery: key fields inside inlined bootstrap JSON.
//!
//! The state blob is frequently truncated or mangled by anti-scraping
//! obfuscation, so it is never parsed as JSON. Key fields are matched one at
//! a time with a field-level pattern instead.

use super::{KeyExtractor, ListingDocument};
use crate::models::{JobKey, JOB_KEY_PATTERN};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Selector;

static SCRIPT: Lazy<Selector> = Lazy::new(|| Selector::parse("script").unwrap());

/// Substrings that identify an application bootstrap script.
const STATE_MARKERS: &[&str] = &[
    "mosaic-provider-jobcards",
    "window.mosaic.providerData",
    "_initialData",
    "__NEXT_DATA__",
    "jobKeysWithInfo",
];

/// A `jobkey`/`jobKey`/`jk` field whose name is not the tail of a longer name.
static KEY_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?:^|[^A-Za-z0-9_])["']?(?:jobkey|jobKey|jk)["']?\s*:\s*["']({JOB_KEY_PATTERN})["']"#
    ))
    .unwrap()
});

#[derive(Debug, Clone, Copy)]
pub struct EmbeddedState;

impl EmbeddedState {
    /// Keys from one blob of (possibly broken) script text.
    pub fn keys_in_blob(blob: &str) -> impl Iterator<Item = JobKey> + '_ {
        KEY_FIELD
            .captures_iter(blob)
            .filter_map(|c| c.get(1))
            .filter_map(|m| JobKey::parse(m.as_str()))
    }
}

impl KeyExtractor for EmbeddedState {
    fn name(&self) -> &'static str {
        "embedded-state"
    }

    fn extract(&self, document: &ListingDocument<'_>) -> Vec<JobKey> {
        document
            .html
            .select(&SCRIPT)
            .filter(|s| {
                s.value().id() == Some("__NEXT_DATA__")
                    || s.text().any(|t| STATE_MARKERS.iter().any(|m| t.contains(m)))
            })
            .flat_map(|s| {
                let blob = s.text().collect::<String>();
                EmbeddedState::keys_in_blob(&blob).collect::<Vec<_>>()
            })
            .unique()
            .collect()
    }
}
