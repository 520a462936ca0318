//! Structural discovery: anchors pointing at the canonical detail page.

use super::{KeyExtractor, ListingDocument};
use crate::models::JobKey;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::Selector;
use url::Url;

pub(crate) static DETAIL_ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="viewjob"]"#).unwrap());

static PARSE_BASE: Lazy<Url> = Lazy::new(|| Url::parse("https://localhost/").unwrap());

/// Pull the job key out of an href if it targets `/viewjob?jk=...`.
///
/// Relative and absolute hrefs are both accepted; anything whose path is not
/// the detail page (click-tracking redirects included) is ignored.
pub fn key_from_href(href: &str) -> Option<JobKey> {
    let url = PARSE_BASE.join(href).ok()?;
    if !url.path().ends_with("/viewjob") {
        return None;
    }
    url.query_pairs()
        .find(|(k, _)| k == "jk")
        .and_then(|(_, v)| JobKey::parse(&v))
}

#[derive(Debug, Clone, Copy)]
pub struct Structural;

impl KeyExtractor for Structural {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn extract(&self, document: &ListingDocument<'_>) -> Vec<JobKey> {
        document
            .html
            .select(&DETAIL_ANCHOR)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(key_from_href)
            .unique()
            .collect()
    }
}
