//! Discovery and retrieval for one run.
//!
//! Discovery walks the primary listing surface, then the secondary listing
//! surface, then the feed, stopping at the first that yields any keys. Only
//! after discovery has finished are the targets handed to the worker pool.

use crate::config::ScrapeConfig;
use crate::detail::DetailRetriever;
use crate::extract::RecordExtractor;
use crate::fallback::fallback_pair;
use crate::fetch::transport::Transport;
use crate::fetch::Fetcher;
use crate::models::DetailTarget;
use crate::outputs::RecordSink;
use crate::paginator::Paginator;
use crate::pool::{self, PoolStats};
use crate::site::{SearchQuery, Site, Surface};
use tracing::{error, info, instrument};

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub discovered: usize,
    pub attempted: usize,
    pub emitted: usize,
    pub failed: usize,
}

pub struct Engine<T> {
    fetcher: Fetcher<T>,
    site: Site,
    query: SearchQuery,
    results_wanted: usize,
    max_concurrency: usize,
    thin_text_threshold: usize,
    primary_max_pages: usize,
    secondary_max_pages: usize,
}

impl<T: Transport> Engine<T> {
    pub fn new(config: &ScrapeConfig, fetcher: Fetcher<T>) -> Result<Self, url::ParseError> {
        Ok(Self {
            fetcher,
            site: config.site()?,
            query: config.query(),
            results_wanted: config.results_wanted,
            max_concurrency: config.max_concurrency,
            thin_text_threshold: config.thin_text_threshold,
            primary_max_pages: config.primary_max_pages,
            secondary_max_pages: config.secondary_max_pages,
        })
    }

    #[cfg(test)]
    pub fn fetcher(&self) -> &Fetcher<T> {
        &self.fetcher
    }

    /// Targets from the first surface that yields any, capped to
    /// `results_wanted`. Empty only when every surface came up empty.
    #[instrument(level = "info", skip_all, fields(keyword = %self.query.keyword, location = %self.query.location))]
    pub async fn discover(&self) -> Vec<DetailTarget> {
        let paginator = Paginator::new(&self.fetcher, &self.site, &self.query, self.results_wanted);
        let p = &paginator;
        let empty = |targets: &Vec<DetailTarget>| targets.is_empty();

        let found = fallback_pair(
            "listing",
            || p.listing(Surface::Primary, self.primary_max_pages),
            |_| {
                fallback_pair(
                    "secondary listing",
                    || p.listing(Surface::Secondary, self.secondary_max_pages),
                    |_| p.feed(),
                    empty,
                )
            },
            empty,
        )
        .await;

        let mut targets = match found {
            Ok(targets) => targets,
            Err(e) => {
                error!(error = %e, "Every discovery surface failed");
                Vec::new()
            }
        };
        targets.truncate(self.results_wanted);

        if targets.is_empty() {
            error!("No jobs discovered after all strategies. Check proxies and inputs.");
        } else {
            info!(count = targets.len(), "Discovery finished");
        }
        targets
    }

    /// Discover, then retrieve every target through `extractor` into `sink`.
    #[instrument(level = "info", skip_all)]
    pub async fn run<X, K>(&self, extractor: &X, sink: &K) -> RunSummary
    where
        X: RecordExtractor,
        K: RecordSink,
    {
        let targets = self.discover().await;
        let discovered = targets.len();
        if targets.is_empty() {
            return RunSummary::default();
        }

        let retriever = DetailRetriever::new(&self.fetcher, &self.site, extractor, self.thin_text_threshold);
        let r = &retriever;
        let PoolStats {
            attempted,
            emitted,
            failed,
        } = pool::run(
            targets,
            self.results_wanted,
            self.max_concurrency,
            move |target| r.retrieve(target),
            sink,
        )
        .await;

        RunSummary {
            discovered,
            attempted,
            emitted,
            failed,
        }
    }
}
