//! Data models flowing through discovery and retrieval.
//!
//! - [`JobKey`]: the opaque posting identifier, the only deduplication handle
//! - [`Seed`]: field fragments harvested from a listing card or feed entry
//! - [`DetailTarget`]: a key plus its seed, handed to the worker pool
//! - [`Record`]: the structured posting emitted to the output sink

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical textual shape of a job key wherever it appears in a document.
pub const JOB_KEY_PATTERN: &str = "[0-9a-fA-F]{16}";

static JOB_KEY_EXACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^{JOB_KEY_PATTERN}$")).unwrap());

/// Opaque identifier of one posting.
///
/// Keys are normalized to lowercase so that two occurrences of the same
/// identifier compare equal regardless of which strategy found them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobKey(String);

impl JobKey {
    /// Validate and normalize a raw identifier.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        JOB_KEY_EXACT
            .is_match(raw)
            .then(|| JobKey(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Listing-card fragments used only when the detail page lacks a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Seed {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub date_posted: Option<String>,
}

impl Seed {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.company.is_none()
            && self.location.is_none()
            && self.date_posted.is_none()
    }

    /// Fill fields still missing here from `other`, keeping what is present.
    pub fn absorb(&mut self, other: Seed) {
        self.title = self.title.take().or(other.title);
        self.company = self.company.take().or(other.company);
        self.location = self.location.take().or(other.location);
        self.date_posted = self.date_posted.take().or(other.date_posted);
    }
}

/// One unit of work for the worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailTarget {
    pub key: JobKey,
    pub seed: Seed,
}

impl DetailTarget {
    pub fn new(key: JobKey) -> Self {
        Self {
            key,
            seed: Seed::default(),
        }
    }
}

impl fmt::Display for DetailTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.key, f)
    }
}

/// A fully extracted job posting.
///
/// Every field except `url` may be null when neither the detail document nor
/// the seed supplied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description_html: Option<String>,
    pub description_text: Option<String>,
    pub date_posted: Option<String>,
    pub job_types: Option<Vec<String>>,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_key_normalizes_case() {
        let a = JobKey::parse("ABC123DEF4567890").unwrap();
        let b = JobKey::parse("abc123def4567890").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "abc123def4567890");
    }

    #[test]
    fn test_job_key_rejects_wrong_shape() {
        assert!(JobKey::parse("abc").is_none());
        assert!(JobKey::parse("zzzzzzzzzzzzzzzz").is_none());
        assert!(JobKey::parse("abc123def45678901").is_none());
        assert!(JobKey::parse(" abc123def4567890 ").is_some());
    }

    #[test]
    fn test_seed_absorb_keeps_existing_fields() {
        let mut seed = Seed {
            title: Some("Office Manager".to_string()),
            ..Seed::default()
        };
        seed.absorb(Seed {
            title: Some("Other".to_string()),
            company: Some("Acme".to_string()),
            ..Seed::default()
        });
        assert_eq!(seed.title.as_deref(), Some("Office Manager"));
        assert_eq!(seed.company.as_deref(), Some("Acme"));
        assert!(seed.location.is_none());
    }

    #[test]
    fn test_record_serializes_nulls() {
        let record = Record {
            title: Some("Clerk".to_string()),
            company: None,
            location: None,
            description_html: None,
            description_text: None,
            date_posted: None,
            job_types: None,
            url: "https://m.indeed.com/viewjob?jk=abc123def4567890".to_string(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"company\":null"));
        assert!(json.contains("\"job_types\":null"));
        assert!(json.contains("viewjob?jk=abc123def4567890"));
    }
}
