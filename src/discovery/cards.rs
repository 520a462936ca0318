//! Seed fields harvested from listing cards.
//!
//! Each detail anchor sits inside a result card that usually repeats the
//! title, company, location and posting age. These fragments back-fill a
//! record when the detail page itself lacks a field.

use super::structural::{key_from_href, DETAIL_ANCHOR};
use super::ListingDocument;
use crate::dom::{element_text, first_text_in, selectors};
use crate::models::{JobKey, Seed};
use crate::utils::non_empty;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use std::collections::HashMap;

static TITLE: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&["h2", "h3", ".jobTitle", "span.jobTitle"]));
static COMPANY: Lazy<Vec<Selector>> =
    Lazy::new(|| selectors(&["[data-company-name]", ".companyName", "[data-testid=\"company-name\"]"]));
static LOCATION: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        "[data-testid=\"text-location\"]",
        ".companyLocation",
        ".company_location",
    ])
});
static SPAN: Lazy<Selector> = Lazy::new(|| Selector::parse("span").unwrap());
static DATE_SPAN: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&["span.date", "[data-testid=\"myJobsStateDate\"]"]));

const AGE_WORDS: &[&str] = &["Just posted", "Posted", "Today", "Active"];
const CARD_CLASS_HINTS: &[&str] = &["job_seen_beacon", "cardOutline", "result", "card"];
const MAX_CARD_DEPTH: usize = 8;

/// Seeds for every key found through a detail anchor, merged per key.
pub fn harvest_seeds(document: &ListingDocument<'_>) -> HashMap<JobKey, Seed> {
    let mut seeds: HashMap<JobKey, Seed> = HashMap::new();
    for anchor in document.html.select(&DETAIL_ANCHOR) {
        let Some(key) = anchor.value().attr("href").and_then(key_from_href) else {
            continue;
        };
        let seed = seed_from_card(enclosing_card(anchor));
        seeds.entry(key).or_default().absorb(seed);
    }
    seeds
}

/// Nearest ancestor that looks like a result card, else the nearest block.
fn enclosing_card(anchor: ElementRef<'_>) -> ElementRef<'_> {
    let ancestors: Vec<ElementRef<'_>> = anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .take(MAX_CARD_DEPTH)
        .collect();

    let looks_like_card = |el: &ElementRef<'_>| {
        let v = el.value();
        v.name() == "li"
            || v.attr("data-jk").is_some()
            || v.classes().any(|c| CARD_CLASS_HINTS.iter().any(|h| c.contains(h)))
    };

    ancestors
        .iter()
        .find(|el| looks_like_card(*el))
        .or_else(|| ancestors.iter().find(|el| el.value().name() == "div"))
        .copied()
        .unwrap_or(anchor)
}

fn seed_from_card(card: ElementRef<'_>) -> Seed {
    Seed {
        title: first_text_in(card, &TITLE),
        company: first_text_in(card, &COMPANY),
        location: first_text_in(card, &LOCATION),
        date_posted: posted_age(card),
    }
}

fn posted_age(card: ElementRef<'_>) -> Option<String> {
    card.select(&SPAN)
        .map(element_text)
        .find(|t| AGE_WORDS.iter().any(|w| t.contains(w)))
        .and_then(|t| non_empty(&t))
        .or_else(|| first_text_in(card, &DATE_SPAN))
}
