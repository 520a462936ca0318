//! Raw-text discovery: the key pattern wherever it occurs, markup ignored.

use super::{KeyExtractor, ListingDocument};
use crate::models::{JobKey, JOB_KEY_PATTERN};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

static KEY_IN_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?:[?&;]jk=|data-jk=["']?)({JOB_KEY_PATTERN})\b"#
    ))
    .unwrap()
});

#[derive(Debug, Clone, Copy)]
pub struct RawPattern;

impl KeyExtractor for RawPattern {
    fn name(&self) -> &'static str {
        "raw-pattern"
    }

    fn extract(&self, document: &ListingDocument<'_>) -> Vec<JobKey> {
        KEY_IN_TEXT
            .captures_iter(document.raw)
            .filter_map(|c| c.get(1))
            .filter_map(|m| JobKey::parse(m.as_str()))
            .unique()
            .collect()
    }
}
