//! Detail-page field extraction.
//!
//! Extraction is pluggable through [`RecordExtractor`]. [`PostingExtractor`]
//! is the default: ordered selector lists per field, first non-blank match
//! wins, and any field still missing falls back to the target's seed.

use crate::dom::{element_text, first_inner_html, first_text, selectors};
use crate::models::{Record, Seed};
use crate::utils::non_empty;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

/// Turns one detail document into a record.
pub trait RecordExtractor {
    fn extract(&self, document: &str, url: &str, seed: &Seed) -> Record;
}

static TITLE: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        r#"h1[data-testid="jobsearch-JobTitle"]"#,
        "h1.jobsearch-JobInfoHeader-title",
        "h1.jobsearch-JobInfoHeader-title-container",
        "h1",
    ])
});

static COMPANY: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        "[data-company-name] a",
        "[data-company-name]",
        r#"div[data-testid="inlineHeader-companyName"]"#,
        ".jobsearch-CompanyInfoWithoutHeaderImage div a",
        ".jobsearch-CompanyInfoWithoutHeaderImage div",
        "div.jobsearch-CompanyInfoContainer a",
        "div.jobsearch-CompanyInfoContainer",
    ])
});

static LOCATION: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        r#"div[data-testid="inlineHeader-companyLocation"]"#,
        r#"div[data-testid="job-location"]"#,
        ".jobsearch-CompanyInfoWithoutHeaderImage > div:last-child",
        "div.jobsearch-CompanyInfoContainer ~ div",
    ])
});

/// Containers that hold the job description. Their absence is one half of
/// the thinness test.
pub static DESCRIPTION: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        "#jobDescriptionText",
        "div#jobDescriptionText",
        "section#jobDescriptionText",
        "div#jobDescriptionTextContainer",
        "#jobDescriptionTextContainer",
    ])
});

static DESCRIPTION_TEXT_FALLBACK: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        "#jobDescriptionText",
        "section#jobDescriptionText",
        "article",
        "#jobDescriptionTextContainer",
    ])
});

static FOOTER: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        "div.jobsearch-JobMetadataFooter",
        r#"[data-testid="jobsearch-JobMetadataFooter"]"#,
    ])
});

static JOB_DETAILS_ITEMS: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"div[data-testid="job-details"] li"#).unwrap());
static LIST_ITEM: Lazy<Selector> = Lazy::new(|| Selector::parse("li").unwrap());

static JOB_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)full[-\s]?time|part[-\s]?time|contract|temporary|intern(ship)?|commission|per[-\s]?diem|apprenticeship|remote").unwrap()
});

/// Posting-age phrases, most specific first.
static POSTED_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(Just posted|Today)",
        r"(?i)Posted\s+\d+\+?\s+(?:day|days|hour|hours)\s+ago",
        r"(?i)\d+\+?\s+(?:day|days|hour|hours)\s+ago",
        r"(?i)Active\s+\d+\+?\s+(?:day|days|hour|hours)\s+ago",
        r"(?i)Posted[^|]+",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Posting-age string from the metadata footer, never from anywhere else.
pub fn posted_from_footer(html: &Html) -> Option<String> {
    let footer = first_text(html, &FOOTER)?;
    POSTED_PATTERNS
        .iter()
        .find_map(|re| re.find(&footer))
        .and_then(|m| non_empty(m.as_str()))
}

fn job_types(html: &Html) -> Option<Vec<String>> {
    let detailed = html.select(&JOB_DETAILS_ITEMS).map(element_text);
    let tagged = html
        .select(&LIST_ITEM)
        .map(element_text)
        .filter(|t| JOB_TYPE.is_match(t));
    let types: Vec<String> = detailed
        .chain(tagged)
        .filter(|t| !t.is_empty())
        .unique()
        .collect();
    (!types.is_empty()).then_some(types)
}

/// Selector-driven extractor for the site's detail pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostingExtractor;

impl RecordExtractor for PostingExtractor {
    fn extract(&self, document: &str, url: &str, seed: &Seed) -> Record {
        let html = Html::parse_document(document);

        let description_html = first_inner_html(&html, &DESCRIPTION);
        let description_text = match &description_html {
            Some(inner) => non_empty(&element_text(Html::parse_fragment(inner).root_element())),
            None => first_text(&html, &DESCRIPTION_TEXT_FALLBACK),
        };

        Record {
            title: first_text(&html, &TITLE).or_else(|| seed.title.clone()),
            company: first_text(&html, &COMPANY).or_else(|| seed.company.clone()),
            location: first_text(&html, &LOCATION).or_else(|| seed.location.clone()),
            description_html,
            description_text,
            date_posted: posted_from_footer(&html).or_else(|| seed.date_posted.clone()),
            job_types: job_types(&html),
            url: url.to_string(),
        }
    }
}
