//! Paginated discovery over one listing surface.
//!
//! ```text
//! Fetching(cursor) ──fetch failed──────────────▶ done (surface abandoned)
//!        │
//!        └─ok─▶ run strategies, merge keys
//!                 ├─ accumulator full ─────────▶ done
//!                 ├─ page budget spent ────────▶ done
//!                 ├─ next == cursor / none ────▶ done
//!                 └─ otherwise ────────────────▶ Fetching(next)
//! ```
//!
//! The next cursor is the explicit pagination control's target when the page
//! has one, else the current URL with its `start` offset advanced by one
//! page.

use crate::discovery::cards::harvest_seeds;
use crate::discovery::feed::parse_feed;
use crate::discovery::{discover_keys, ListingDocument};
use crate::fetch::transport::Transport;
use crate::fetch::{FetchFailure, FetchRequest, Fetcher};
use crate::models::{DetailTarget, JobKey, Seed};
use crate::site::{SearchQuery, Site, Surface};
use once_cell::sync::Lazy;
use scraper::Selector;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Results per listing page; the offset step when no next control exists.
pub const PAGE_SIZE: usize = 10;
pub const LISTING_TIMEOUT: Duration = Duration::from_secs(45);
pub const FEED_ATTEMPTS: u32 = 5;

static NEXT_CONTROL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"a[aria-label="Next"], a[aria-label="Next Page"], a[data-testid="pagination-page-next"]"#,
    )
    .unwrap()
});

/// A fetched listing document and the cursor it was fetched from.
pub struct ListingPage {
    pub cursor: Url,
    pub body: String,
}

/// What one listing page contributed.
#[derive(Debug)]
pub struct PageScan {
    pub keys: Vec<JobKey>,
    pub seeds: HashMap<JobKey, Seed>,
    pub next: Option<Url>,
}

impl ListingPage {
    /// Run every discovery strategy and work out the next cursor.
    pub fn scan(&self, site: &Site, surface: Surface) -> PageScan {
        let document = ListingDocument::parse(&self.body);
        let explicit_next = document
            .html
            .select(&NEXT_CONTROL)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| site.resolve(surface, href))
            .find(|url| url.path().ends_with("/jobs"));

        PageScan {
            keys: discover_keys(&document),
            seeds: harvest_seeds(&document),
            next: explicit_next.or_else(|| Some(advance_offset(&self.cursor, PAGE_SIZE))),
        }
    }
}

/// `url` with its `start` query parameter advanced by `step`.
pub fn advance_offset(url: &Url, step: usize) -> Url {
    let mut start = 0usize;
    let mut pairs: Vec<(String, String)> = Vec::new();
    for (k, v) in url.query_pairs() {
        if k == "start" {
            start = v.parse().unwrap_or(0);
        } else {
            pairs.push((k.into_owned(), v.into_owned()));
        }
    }

    let mut next = url.clone();
    {
        let mut q = next.query_pairs_mut();
        q.clear();
        for (k, v) in &pairs {
            q.append_pair(k, v);
        }
        q.append_pair("start", &(start + step).to_string());
    }
    next
}

/// Order-preserving, deduplicating, capped collection of targets.
#[derive(Debug)]
pub struct Accumulator {
    cap: usize,
    targets: Vec<DetailTarget>,
    index: HashMap<JobKey, usize>,
}

impl Accumulator {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            targets: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.targets.len() >= self.cap
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Add unseen keys until full; seeds enrich new and already-held keys.
    /// Returns how many new targets were added.
    pub fn extend(&mut self, keys: Vec<JobKey>, mut seeds: HashMap<JobKey, Seed>) -> usize {
        let mut added = 0;
        for key in keys {
            let seed = seeds.remove(&key).unwrap_or_default();
            if let Some(&i) = self.index.get(&key) {
                self.targets[i].seed.absorb(seed);
                continue;
            }
            if self.is_full() {
                continue;
            }
            self.index.insert(key.clone(), self.targets.len());
            self.targets.push(DetailTarget { key, seed });
            added += 1;
        }
        added
    }

    pub fn into_targets(self) -> Vec<DetailTarget> {
        self.targets
    }
}

/// Drives listing and feed fetches for one run.
pub struct Paginator<'a, T> {
    fetcher: &'a Fetcher<T>,
    site: &'a Site,
    query: &'a SearchQuery,
    wanted: usize,
}

impl<'a, T: Transport> Paginator<'a, T> {
    pub fn new(fetcher: &'a Fetcher<T>, site: &'a Site, query: &'a SearchQuery, wanted: usize) -> Self {
        Self {
            fetcher,
            site,
            query,
            wanted,
        }
    }

    /// Walk one listing surface until enough keys, no next page, or
    /// `max_pages` pages.
    ///
    /// # Arguments
    ///
    /// * `surface` - Which listing host to walk
    /// * `max_pages` - Page budget for this surface
    ///
    /// # Returns
    ///
    /// Targets in first-seen order, at most `wanted` of them. A failure on a
    /// later page ends the walk but keeps what was collected.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure if the very first page cannot be fetched.
    #[instrument(level = "info", skip_all, fields(%surface, max_pages = max_pages))]
    pub async fn listing(&self, surface: Surface, max_pages: usize) -> Result<Vec<DetailTarget>, FetchFailure> {
        let mut cursor = self.site.listing_url(surface, self.query);
        let mut acc = Accumulator::new(self.wanted);
        let mut visited: HashSet<Url> = HashSet::new();

        for page in 0..max_pages {
            if acc.is_full() {
                break;
            }
            visited.insert(cursor.clone());
            let request = FetchRequest::new(cursor.clone(), surface).timeout(LISTING_TIMEOUT);
            let body = match self.fetcher.fetch(&request).await {
                Ok(body) => body,
                Err(e) if page == 0 => {
                    warn!(page, error = %e, "Listing fetch failed on first page; abandoning surface");
                    return Err(e);
                }
                Err(e) => {
                    warn!(page, error = %e, "Listing fetch failed; abandoning surface");
                    break;
                }
            };

            let listing = ListingPage { cursor, body };
            let scan = listing.scan(self.site, surface);
            let found = scan.keys.len();
            let added = acc.extend(scan.keys, scan.seeds);
            info!(page, found, added, total = acc.len(), "Scanned listing page");

            match scan.next {
                Some(next) if next != listing.cursor && !visited.contains(&next) => cursor = next,
                _ => {
                    debug!(page, "No further listing page");
                    break;
                }
            }
        }

        Ok(acc.into_targets())
    }

    /// Read the lightweight feed surface once (with the fetcher's retries).
    #[instrument(level = "info", skip_all)]
    pub async fn feed(&self) -> Result<Vec<DetailTarget>, FetchFailure> {
        let request = FetchRequest::new(self.site.feed_url(self.query), Surface::Secondary)
            .feed()
            .attempts(FEED_ATTEMPTS)
            .timeout(LISTING_TIMEOUT);
        let body = self.fetcher.fetch(&request).await?;
        let targets = parse_feed(&body, self.wanted);
        info!(count = targets.len(), "Read feed entries");
        Ok(targets)
    }
}
