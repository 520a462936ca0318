//! Target-site hosts and canonical URL construction.
//!
//! Only listing, feed and detail URLs are ever built here. Click-tracking
//! and ad-redirect paths (`/rc/clk`, `/pagead/clk`) are hard-block hotspots;
//! nothing in this crate constructs them, and detail URLs are always rebuilt
//! from the job key rather than followed from a listing href.

use crate::models::JobKey;
use std::fmt;
use url::Url;

pub const DEFAULT_DOMAIN: &str = "indeed.com";

/// Device class a request is shaped for.
///
/// The primary surface is the mobile site; the secondary surface is the
/// desktop site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Primary,
    Secondary,
}

impl Surface {
    pub fn is_mobile(self) -> bool {
        matches!(self, Surface::Primary)
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Surface::Primary => f.write_str("primary"),
            Surface::Secondary => f.write_str("secondary"),
        }
    }
}

/// Search parameters shared by every listing and feed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keyword: String,
    pub location: String,
    pub fromage: String,
}

/// Hosts for the mobile and desktop variants of one site domain.
#[derive(Debug, Clone)]
pub struct Site {
    mobile: Url,
    desktop: Url,
}

impl Site {
    /// Derive both hosts from a domain such as `indeed.com` or `uk.indeed.com`.
    ///
    /// A bare two-label domain gets a `www.` desktop host; a domain that
    /// already carries a country subdomain is used as-is for desktop. The
    /// mobile host is always `m.` prepended to the domain.
    pub fn new(domain: &str) -> Result<Self, url::ParseError> {
        let domain = domain
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        let domain = domain.strip_prefix("www.").unwrap_or(domain);
        let desktop_host = if domain.split('.').count() == 2 {
            format!("www.{domain}")
        } else {
            domain.to_string()
        };
        Ok(Self {
            mobile: Url::parse(&format!("https://m.{domain}"))?,
            desktop: Url::parse(&format!("https://{desktop_host}"))?,
        })
    }

    pub fn base(&self, surface: Surface) -> &Url {
        match surface {
            Surface::Primary => &self.mobile,
            Surface::Secondary => &self.desktop,
        }
    }

    /// `/jobs?q=..&l=..&fromage=..` on the given surface.
    pub fn listing_url(&self, surface: Surface, query: &SearchQuery) -> Url {
        self.search_url(self.base(surface), "/jobs", query)
    }

    /// `/rss?q=..&l=..&fromage=..`, served from the desktop host.
    pub fn feed_url(&self, query: &SearchQuery) -> Url {
        self.search_url(&self.desktop, "/rss", query)
    }

    /// Canonical `/viewjob?jk=..` detail URL on the given surface.
    pub fn detail_url(&self, surface: Surface, key: &JobKey) -> Url {
        let mut url = self.base(surface).clone();
        url.set_path("/viewjob");
        url.query_pairs_mut().clear().append_pair("jk", key.as_str());
        url
    }

    /// Resolve a possibly relative href found in a document from `surface`.
    pub fn resolve(&self, surface: Surface, href: &str) -> Option<Url> {
        self.base(surface).join(href).ok()
    }

    fn search_url(&self, base: &Url, path: &str, query: &SearchQuery) -> Url {
        let mut url = base.clone();
        url.set_path(path);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            if !query.keyword.is_empty() {
                pairs.append_pair("q", &query.keyword);
            }
            if !query.location.is_empty() {
                pairs.append_pair("l", &query.location);
            }
            if !query.fromage.is_empty() {
                pairs.append_pair("fromage", &query.fromage);
            }
        }
        url
    }
}
