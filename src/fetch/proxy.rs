//! Proxy endpoint rotation.
//!
//! The fetcher asks for a new endpoint before every attempt; the rotation
//! policy is entirely the source's business.

use std::sync::atomic::{AtomicUsize, Ordering};

pub trait ProxySource: Send + Sync {
    /// Endpoint for the next attempt, or `None` to connect directly.
    fn new_endpoint(&self) -> Option<String>;
}

/// Direct connections only.
#[derive(Debug, Default)]
pub struct NoProxy;

impl ProxySource for NoProxy {
    fn new_endpoint(&self) -> Option<String> {
        None
    }
}

/// Round-robin over a fixed list of proxy URLs.
#[derive(Debug)]
pub struct RotatingProxies {
    endpoints: Vec<String>,
    cursor: AtomicUsize,
}

impl RotatingProxies {
    pub fn new(endpoints: Vec<String>) -> Self {
        Self {
            endpoints,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }
}

impl ProxySource for RotatingProxies {
    fn new_endpoint(&self) -> Option<String> {
        if self.endpoints.is_empty() {
            return None;
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.endpoints.len();
        Some(self.endpoints[i].clone())
    }
}
