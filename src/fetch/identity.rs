//! Synthetic browser identities.
//!
//! A fresh identity is drawn for every attempt, so retries of the same URL
//! present a different user agent. The pool is chosen by the surface's
//! device class.

use crate::site::Surface;
use rand::seq::IndexedRandom;

const DESKTOP_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:123.0) Gecko/20100101 Firefox/123.0",
];

const MOBILE_AGENTS: &[&str] = &[
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 14; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 14; SM-G990B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36",
];

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const FEED_ACCEPT: &str = "application/rss+xml, application/xml;q=0.9,*/*;q=0.8";

/// What the response body is expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Html,
    Feed,
}

/// One user agent plus the header set sent alongside it.
#[derive(Debug, Clone)]
pub struct BrowserIdentity {
    pub user_agent: &'static str,
    pub headers: Vec<(&'static str, String)>,
}

impl BrowserIdentity {
    /// Draw a random identity matching the surface's device class.
    pub fn pick(surface: Surface, kind: DocumentKind) -> Self {
        let pool = if surface.is_mobile() {
            MOBILE_AGENTS
        } else {
            DESKTOP_AGENTS
        };
        let user_agent = pool.choose(&mut rand::rng()).copied().unwrap_or(pool[0]);
        let accept = match kind {
            DocumentKind::Html => HTML_ACCEPT,
            DocumentKind::Feed => FEED_ACCEPT,
        };

        let headers = vec![
            ("user-agent", user_agent.to_string()),
            ("accept", accept.to_string()),
            ("accept-language", "en-US,en;q=0.9".to_string()),
            ("upgrade-insecure-requests", "1".to_string()),
            ("referer", "https://www.google.com/".to_string()),
            ("cache-control", "no-cache".to_string()),
            ("pragma", "no-cache".to_string()),
            ("connection", "close".to_string()),
        ];
        Self {
            user_agent,
            headers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mobile_surface_gets_mobile_agent() {
        for _ in 0..20 {
            let id = BrowserIdentity::pick(Surface::Primary, DocumentKind::Html);
            assert!(MOBILE_AGENTS.contains(&id.user_agent));
            assert!(id.user_agent.contains("Mobile"));
        }
    }

    #[test]
    fn test_desktop_surface_gets_desktop_agent() {
        for _ in 0..20 {
            let id = BrowserIdentity::pick(Surface::Secondary, DocumentKind::Html);
            assert!(DESKTOP_AGENTS.contains(&id.user_agent));
        }
    }

    #[test]
    fn test_feed_accept_header() {
        let id = BrowserIdentity::pick(Surface::Secondary, DocumentKind::Feed);
        let accept = id.headers.iter().find(|(k, _)| *k == "accept").unwrap();
        assert!(accept.1.starts_with("application/rss+xml"));
        assert!(id.headers.iter().any(|(k, v)| *k == "user-agent" && v == id.user_agent));
    }
}
