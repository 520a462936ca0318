//! Job-key discovery from listing documents.
//!
//! Three independent strategies each pull job keys out of a listing page:
//!
//! | Strategy | Module | Looks at |
//! |----------|--------|----------|
//! | Structural | [`structural`] | `<a href=".../viewjob?jk=...">` anchors |
//! | Embedded state | [`embedded`] | inlined bootstrap JSON in `<script>` blocks |
//! | Raw pattern | [`pattern`] | the raw text, ignoring markup entirely |
//!
//! All three run on every page and their results are unioned; presence in
//! any one is enough. Each is pure, so running them twice over the same
//! document yields the same keys in the same order.
//!
//! [`cards`] harvests seed fields from listing cards and [`feed`] reads the
//! lightweight RSS surface, which yields keys from structured entries.

pub mod cards;
pub mod embedded;
pub mod feed;
pub mod pattern;
pub mod structural;

use crate::models::JobKey;
use itertools::Itertools;
use scraper::Html;

pub use embedded::EmbeddedState;
pub use pattern::RawPattern;
pub use structural::Structural;

/// A listing page held in memory: the raw text plus its parsed DOM.
pub struct ListingDocument<'a> {
    pub raw: &'a str,
    pub html: Html,
}

impl<'a> ListingDocument<'a> {
    pub fn parse(raw: &'a str) -> Self {
        Self {
            raw,
            html: Html::parse_document(raw),
        }
    }
}

/// One way of finding job keys in a listing document.
pub trait KeyExtractor {
    fn name(&self) -> &'static str;

    /// Keys in order of first appearance, without duplicates.
    fn extract(&self, document: &ListingDocument<'_>) -> Vec<JobKey>;
}

/// The three strategies, in the order their results are merged.
pub const STRATEGIES: [&dyn KeyExtractor; 3] = [&Structural, &EmbeddedState, &RawPattern];

/// Union of every strategy's keys, first occurrence wins the position.
pub fn discover_keys(document: &ListingDocument<'_>) -> Vec<JobKey> {
    merge_strategies(&STRATEGIES, document)
}

pub fn merge_strategies(
    strategies: &[&dyn KeyExtractor],
    document: &ListingDocument<'_>,
) -> Vec<JobKey> {
    strategies
        .iter()
        .flat_map(|s| {
            let keys = s.extract(document);
            tracing::trace!(strategy = s.name(), count = keys.len(), "strategy keys");
            keys
        })
        .unique()
        .collect()
}
