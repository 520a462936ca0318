//! The network seam under the fetcher.
//!
//! [`Transport`] performs exactly one GET with no retry and no status
//! interpretation. [`ReqwestTransport`] is the real implementation; tests
//! substitute a scripted one.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::redirect::Policy;
use tracing::{debug, instrument};

/// Everything needed to issue one network attempt.
#[derive(Debug, Clone)]
pub struct HttpAttempt {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub proxy: Option<String>,
    pub timeout: Duration,
}

/// Status and body of a completed attempt, whatever the status.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

pub trait Transport {
    /// Issue one GET. `Err` means no HTTP response was obtained at all.
    async fn get(&self, attempt: &HttpAttempt) -> Result<RawResponse, String>;
}

/// Paths that trigger hard blocks; redirects into them are never followed.
const HOSTILE_PATHS: &[&str] = &["/rc/clk", "/pagead/clk"];

/// `reqwest`-backed transport with one cached client per proxy endpoint.
#[derive(Debug, Default)]
pub struct ReqwestTransport {
    clients: Mutex<HashMap<Option<String>, reqwest::Client>>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn client_for(&self, proxy: Option<&String>) -> Result<reqwest::Client, String> {
        let mut clients = self.clients.lock().map_err(|e| e.to_string())?;
        let key = proxy.cloned();
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let redirect = Policy::custom(|attempt| {
            if HOSTILE_PATHS
                .iter()
                .any(|p| attempt.url().path().starts_with(p))
            {
                attempt.stop()
            } else if attempt.previous().len() >= 5 {
                attempt.error("too many redirects")
            } else {
                attempt.follow()
            }
        });
        let mut builder = reqwest::Client::builder().http1_only().redirect(redirect);
        if let Some(endpoint) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(endpoint).map_err(|e| e.to_string())?);
        }
        let client = builder.build().map_err(|e| e.to_string())?;
        debug!(proxied = proxy.is_some(), "Built HTTP client");
        clients.insert(key, client.clone());
        Ok(client)
    }
}

impl Transport for ReqwestTransport {
    #[instrument(level = "debug", skip_all, fields(url = %attempt.url))]
    async fn get(&self, attempt: &HttpAttempt) -> Result<RawResponse, String> {
        let client = self.client_for(attempt.proxy.as_ref())?;
        let mut request = client.get(&attempt.url).timeout(attempt.timeout);
        for (name, value) in &attempt.headers {
            request = request.header(*name, value);
        }
        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| e.to_string())?;
        Ok(RawResponse { status, body })
    }
}
