//! Detail retrieval: mobile first, desktop as fallback.
//!
//! The primary (mobile) detail page is fetched first. If that fetch fails the
//! same key is tried on the secondary (desktop) surface. If it succeeds but
//! the page is thin, the secondary is fetched once more and preferred when it
//! arrives; otherwise the thin primary page is used as-is.

use crate::dom::visible_text;
use crate::extract::{RecordExtractor, DESCRIPTION};
use crate::fallback::{fallback_pair, Trigger};
use crate::fetch::transport::Transport;
use crate::fetch::{FetchFailure, FetchRequest, Fetcher};
use crate::models::{DetailTarget, Record};
use crate::site::{Site, Surface};
use scraper::Html;
use tracing::{debug, info, instrument};

/// Attempt budget for the desktop refetch of a thin mobile page.
pub const THIN_REFETCH_ATTEMPTS: u32 = 3;

/// A page is thin when it has no description container and its visible text
/// is shorter than `min_text_chars`.
pub fn is_thin(document: &str, min_text_chars: usize) -> bool {
    let html = Html::parse_document(document);
    let has_description = DESCRIPTION.iter().any(|sel| html.select(sel).next().is_some());
    !has_description && visible_text(&html).chars().count() < min_text_chars
}

pub struct DetailRetriever<'a, T, X> {
    fetcher: &'a Fetcher<T>,
    site: &'a Site,
    extractor: &'a X,
    thin_text_threshold: usize,
}

impl<'a, T: Transport, X: RecordExtractor> DetailRetriever<'a, T, X> {
    pub fn new(fetcher: &'a Fetcher<T>, site: &'a Site, extractor: &'a X, thin_text_threshold: usize) -> Self {
        Self {
            fetcher,
            site,
            extractor,
            thin_text_threshold,
        }
    }

    /// Fetch and extract one target. Produces at most one record.
    ///
    /// # Errors
    ///
    /// Returns the secondary surface's failure when the primary fetch failed
    /// and the secondary fetch failed too.
    #[instrument(level = "info", skip_all, fields(jk = %target.key))]
    pub async fn retrieve(&self, target: DetailTarget) -> Result<Record, FetchFailure> {
        let primary = FetchRequest::new(self.site.detail_url(Surface::Primary, &target.key), Surface::Primary);
        let secondary_url = self.site.detail_url(Surface::Secondary, &target.key);
        let threshold = self.thin_text_threshold;

        let document = fallback_pair(
            "detail",
            || self.fetcher.fetch(&primary),
            |trigger| {
                let request = FetchRequest::new(secondary_url, Surface::Secondary);
                let request = match trigger {
                    Trigger::Insufficient => request.attempts(THIN_REFETCH_ATTEMPTS),
                    Trigger::PrimaryFailed => request,
                };
                async move { self.fetcher.fetch(&request).await }
            },
            |doc: &String| is_thin(doc, threshold),
        )
        .await?;

        // Records always carry the canonical primary URL, whichever surface served them.
        let url = primary.url.as_str();
        let record = self.extractor.extract(&document, url, &target.seed);
        debug!(bytes = document.len(), "Extracted record");
        info!(title = record.title.as_deref().unwrap_or("-"), "Retrieved posting");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::PostingExtractor;
    use crate::fetch::transport::scripted::{fast_fetcher, ScriptedTransport};
    use crate::models::{JobKey, Seed};

    const FULL: &str = r#"<html><body><h1>Office Manager</h1><div id="jobDescriptionText"><p>Manage the office and its people.</p></div></body></html>"#;
    const DESKTOP_FULL: &str = r#"<html><body><h1>Desktop Office Manager</h1><div id="jobDescriptionText"><p>Manage the office and its people, desktop edition.</p></div></body></html>"#;
    const THIN: &str = r#"<html><head><title>x</title></head><body><div class="app-shell">Loading</div></body></html>"#;

    fn target() -> DetailTarget {
        DetailTarget {
            key: JobKey::parse("aaaaaaaaaaaaaaaa").unwrap(),
            seed: Seed {
                company: Some("Seed Co".into()),
                ..Seed::default()
            },
        }
    }

    #[test]
    fn test_thin_heuristic() {
        assert!(is_thin(THIN, 80));
        assert!(!is_thin(FULL, 80));
        let long_text = format!("<html><body><p>{}</p></body></html>", "word ".repeat(40));
        assert!(!is_thin(&long_text, 80));
        assert!(is_thin(&long_text, 1000));
    }

    #[tokio::test]
    async fn test_good_primary_uses_mobile_only() {
        let transport = ScriptedTransport::new().route("m.indeed.com/viewjob", vec![(200, FULL)]);
        let fetcher = fast_fetcher(transport);
        let site = Site::new("indeed.com").unwrap();
        let retriever = DetailRetriever::new(&fetcher, &site, &PostingExtractor, 80);

        let record = retriever.retrieve(target()).await.unwrap();
        assert_eq!(record.title.as_deref(), Some("Office Manager"));
        assert_eq!(record.company.as_deref(), Some("Seed Co"));
        assert_eq!(record.url, "https://m.indeed.com/viewjob?jk=aaaaaaaaaaaaaaaa");
        assert_eq!(fetcher.transport().count_matching("www.indeed.com"), 0);
    }

    #[tokio::test]
    async fn test_thin_primary_triggers_exactly_one_refetch() {
        let transport = ScriptedTransport::new()
            .route("m.indeed.com/viewjob", vec![(200, THIN)])
            .route("www.indeed.com/viewjob", vec![(200, DESKTOP_FULL)]);
        let fetcher = fast_fetcher(transport);
        let site = Site::new("indeed.com").unwrap();
        let retriever = DetailRetriever::new(&fetcher, &site, &PostingExtractor, 80);

        let record = retriever.retrieve(target()).await.unwrap();
        assert_eq!(record.title.as_deref(), Some("Desktop Office Manager"));
        assert_eq!(record.url, "https://m.indeed.com/viewjob?jk=aaaaaaaaaaaaaaaa");
        assert_eq!(fetcher.transport().count_matching("m.indeed.com"), 1);
        assert_eq!(fetcher.transport().count_matching("www.indeed.com"), 1);
    }

    #[tokio::test]
    async fn test_thin_primary_kept_when_desktop_fails() {
        let transport = ScriptedTransport::new()
            .route("m.indeed.com/viewjob", vec![(200, THIN)])
            .route("www.indeed.com/viewjob", vec![(404, "gone")]);
        let fetcher = fast_fetcher(transport);
        let site = Site::new("indeed.com").unwrap();
        let retriever = DetailRetriever::new(&fetcher, &site, &PostingExtractor, 80);

        let record = retriever.retrieve(target()).await.unwrap();
        assert_eq!(record.title, None);
        assert_eq!(record.company.as_deref(), Some("Seed Co"));
        assert_eq!(fetcher.transport().count_matching("www.indeed.com"), 1);
    }

    #[tokio::test]
    async fn test_failed_primary_falls_back_to_desktop() {
        let transport = ScriptedTransport::new()
            .route("m.indeed.com/viewjob", vec![(403, "")])
            .route("www.indeed.com/viewjob", vec![(200, DESKTOP_FULL)]);
        let fetcher = fast_fetcher(transport);
        let site = Site::new("indeed.com").unwrap();
        let retriever = DetailRetriever::new(&fetcher, &site, &PostingExtractor, 80);

        let record = retriever.retrieve(target()).await.unwrap();
        assert_eq!(record.title.as_deref(), Some("Desktop Office Manager"));
        assert_eq!(fetcher.transport().count_matching("m.indeed.com"), 4);
    }

    #[tokio::test]
    async fn test_both_surfaces_failing_yields_no_record() {
        let transport = ScriptedTransport::new()
            .route("m.indeed.com/viewjob", vec![(500, "")])
            .route("www.indeed.com/viewjob", vec![(429, "")]);
        let fetcher = fast_fetcher(transport);
        let site = Site::new("indeed.com").unwrap();
        let retriever = DetailRetriever::new(&fetcher, &site, &PostingExtractor, 80);

        let out = retriever.retrieve(target()).await;
        assert_eq!(out, Err(FetchFailure::Blocked { status: 429 }));
    }
}
