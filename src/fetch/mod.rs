//! Single retrying HTTP GET with pacing, proxy rotation and response
//! classification.
//!
//! # Attempt state machine
//!
//! ```text
//! Attempting(n) ──ok──────────────────────────▶ Success(body)
//!      │
//!      ├─terminal 4xx─────────────────────────▶ Failed(TerminalHttp)
//!      ├─retryable, n == budget───────────────▶ Failed(last failure)
//!      └─retryable, n <  budget─▶ Retry(n) ──backoff──▶ Attempting(n+1)
//! ```
//!
//! Every network attempt, retries included, first passes the shared
//! [`Pacer`] and draws a fresh proxy endpoint and browser identity.
//!
//! # Backoff
//!
//! ```text
//! delay(n) = min(base * 2^(n-1), cap) + jitter(0..=max_jitter)
//! ```

pub mod identity;
pub mod proxy;
pub mod transport;

use crate::pacer::Pacer;
use crate::site::Surface;
use crate::utils::truncate_for_log;
use identity::{BrowserIdentity, DocumentKind};
use proxy::ProxySource;
use rand::{rng, Rng};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};
use transport::{HttpAttempt, RawResponse, Transport};
use url::Url;

pub const DEFAULT_ATTEMPTS: u32 = 4;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
/// Bodies shorter than this are treated as block pages or empty shells.
pub const MIN_BODY_BYTES: usize = 80;

/// Classified reason a fetch did not produce a usable body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("blocked (HTTP {status})")]
    Blocked { status: u16 },
    #[error("server error (HTTP {status})")]
    ServerError { status: u16 },
    #[error("thin body ({bytes} bytes)")]
    Thin { bytes: usize },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("terminal HTTP error (HTTP {status})")]
    TerminalHttp { status: u16 },
}

impl FetchFailure {
    /// Everything except a terminal 4xx is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchFailure::TerminalHttp { .. })
    }
}

/// Either the raw document body or the last classified failure.
pub type FetchOutcome = Result<String, FetchFailure>;

/// One logical fetch: a URL on a surface with its own attempt budget.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,
    pub surface: Surface,
    pub kind: DocumentKind,
    pub attempts: u32,
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn new(url: Url, surface: Surface) -> Self {
        Self {
            url,
            surface,
            kind: DocumentKind::Html,
            attempts: DEFAULT_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn feed(mut self) -> Self {
        self.kind = DocumentKind::Feed;
        self
    }
}

/// Backoff parameters between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_jitter: Duration,
    pub min_body_bytes: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(700),
            max_delay: Duration::from_millis(7000),
            max_jitter: Duration::from_millis(250),
            min_body_bytes: MIN_BODY_BYTES,
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `failed_attempt + 1`, without jitter.
    pub fn backoff(&self, failed_attempt: u32) -> Duration {
        let shift = failed_attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << shift).min(self.max_delay)
    }

    fn jitter(&self) -> Duration {
        let max = self.max_jitter.as_millis() as u64;
        Duration::from_millis(rng().random_range(0..=max))
    }
}

/// Interpret one raw response.
pub fn classify(response: RawResponse, min_body_bytes: usize) -> FetchOutcome {
    match response.status {
        403 | 429 => Err(FetchFailure::Blocked {
            status: response.status,
        }),
        s if s >= 500 => Err(FetchFailure::ServerError { status: s }),
        s if s >= 400 => Err(FetchFailure::TerminalHttp { status: s }),
        _ if response.body.len() < min_body_bytes => Err(FetchFailure::Thin {
            bytes: response.body.len(),
        }),
        _ => Ok(response.body),
    }
}

enum AttemptState {
    Attempting(u32),
    Retry { attempt: u32, failure: FetchFailure },
    Success(String),
    Failed(FetchFailure),
}

/// Retrying, paced fetcher shared by discovery and detail retrieval.
pub struct Fetcher<T> {
    transport: T,
    proxies: Arc<dyn ProxySource>,
    pacer: Arc<Pacer>,
    policy: RetryPolicy,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T, proxies: Arc<dyn ProxySource>, pacer: Arc<Pacer>) -> Self {
        Self {
            transport,
            proxies,
            pacer,
            policy: RetryPolicy::default(),
        }
    }

    #[cfg(test)]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch `request.url`, retrying retryable failures up to the request's
    /// attempt budget.
    ///
    /// # Arguments
    ///
    /// * `request` - URL, surface, document kind, attempt budget and per-attempt timeout
    ///
    /// # Returns
    ///
    /// The body of the first acceptable response, or the last classified
    /// [`FetchFailure`] once the budget is spent or a terminal 4xx arrives.
    /// Network trouble never panics or aborts the process.
    #[instrument(level = "info", skip_all, fields(url = %request.url, surface = %request.surface))]
    pub async fn fetch(&self, request: &FetchRequest) -> FetchOutcome {
        let budget = request.attempts.max(1);
        let mut state = AttemptState::Attempting(1);

        loop {
            state = match state {
                AttemptState::Attempting(n) => match self.attempt(request, n).await {
                    Ok(body) => AttemptState::Success(body),
                    Err(failure) if !failure.is_retryable() => AttemptState::Failed(failure),
                    Err(failure) if n >= budget => {
                        warn!(attempt = n, max = budget, error = %failure, "fetch exhausted attempts");
                        AttemptState::Failed(failure)
                    }
                    Err(failure) => AttemptState::Retry {
                        attempt: n,
                        failure,
                    },
                },
                AttemptState::Retry { attempt, failure } => {
                    let delay = self.policy.backoff(attempt) + self.policy.jitter();
                    warn!(attempt, max = budget, ?delay, error = %failure, "fetch attempt failed; backing off");
                    sleep(delay).await;
                    AttemptState::Attempting(attempt + 1)
                }
                AttemptState::Success(body) => return Ok(body),
                AttemptState::Failed(failure) => return Err(failure),
            };
        }
    }

    async fn attempt(&self, request: &FetchRequest, n: u32) -> FetchOutcome {
        self.pacer.wait().await;
        let identity = BrowserIdentity::pick(request.surface, request.kind);
        let attempt = HttpAttempt {
            url: request.url.to_string(),
            headers: identity.headers,
            proxy: self.proxies.new_endpoint(),
            timeout: request.timeout,
        };

        let response = self
            .transport
            .get(&attempt)
            .await
            .map_err(FetchFailure::Transport)?;
        debug!(
            attempt = n,
            status = response.status,
            bytes = response.body.len(),
            proxied = attempt.proxy.is_some(),
            user_agent = identity.user_agent,
            preview = %truncate_for_log(&response.body, 120),
            "response received"
        );
        classify(response, self.policy.min_body_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::proxy::{NoProxy, RotatingProxies};
    use super::transport::scripted::ScriptedTransport;
    use super::*;

    const BODY: &str = "<html><body><p>This is a perfectly ordinary document that is long enough to pass.</p></body></html>";

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(40),
            max_delay: Duration::from_millis(500),
            max_jitter: Duration::from_millis(10),
            min_body_bytes: MIN_BODY_BYTES,
        }
    }

    fn fetcher(transport: ScriptedTransport) -> Fetcher<ScriptedTransport> {
        Fetcher::new(
            transport,
            Arc::new(NoProxy),
            Arc::new(Pacer::new(Duration::ZERO)),
        )
        .with_policy(fast_policy())
    }

    fn request() -> FetchRequest {
        FetchRequest::new(
            Url::parse("https://m.indeed.com/jobs?q=office").unwrap(),
            Surface::Primary,
        )
    }

    #[test]
    fn test_classify_statuses() {
        let r = |status, body: &str| RawResponse {
            status,
            body: body.to_string(),
        };
        assert_eq!(classify(r(403, BODY), 80), Err(FetchFailure::Blocked { status: 403 }));
        assert_eq!(classify(r(429, BODY), 80), Err(FetchFailure::Blocked { status: 429 }));
        assert_eq!(classify(r(503, BODY), 80), Err(FetchFailure::ServerError { status: 503 }));
        assert_eq!(classify(r(404, BODY), 80), Err(FetchFailure::TerminalHttp { status: 404 }));
        assert_eq!(classify(r(200, "tiny"), 80), Err(FetchFailure::Thin { bytes: 4 }));
        assert_eq!(classify(r(200, BODY), 80), Ok(BODY.to_string()));
    }

    #[test]
    fn test_retryable_taxonomy() {
        assert!(FetchFailure::Blocked { status: 429 }.is_retryable());
        assert!(FetchFailure::ServerError { status: 500 }.is_retryable());
        assert!(FetchFailure::Thin { bytes: 3 }.is_retryable());
        assert!(FetchFailure::Transport("reset".into()).is_retryable());
        assert!(!FetchFailure::TerminalHttp { status: 404 }.is_retryable());
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(700));
        assert_eq!(policy.backoff(2), Duration::from_millis(1400));
        assert_eq!(policy.backoff(3), Duration::from_millis(2800));
        assert_eq!(policy.backoff(4), Duration::from_millis(5600));
        assert_eq!(policy.backoff(5), Duration::from_millis(7000));
        assert_eq!(policy.backoff(40), Duration::from_millis(7000));
    }

    #[tokio::test]
    async fn test_recovers_after_two_rate_limits() {
        let transport = ScriptedTransport::new().route("/jobs", vec![(429, ""), (429, ""), (200, BODY)]);
        let fetcher = fetcher(transport);

        let outcome = fetcher.fetch(&request()).await;
        assert_eq!(outcome, Ok(BODY.to_string()));

        let seen = fetcher.transport().seen();
        assert_eq!(seen.len(), 3);
        let gap1 = seen[1].at - seen[0].at;
        let gap2 = seen[2].at - seen[1].at;
        assert!(gap1 >= Duration::from_millis(40));
        assert!(gap2 > gap1, "expected {gap2:?} > {gap1:?}");
    }

    #[tokio::test]
    async fn test_terminal_error_is_not_retried() {
        let transport = ScriptedTransport::new().route("/jobs", vec![(404, BODY), (200, BODY)]);
        let fetcher = fetcher(transport);

        let outcome = fetcher.fetch(&request()).await;
        assert_eq!(outcome, Err(FetchFailure::TerminalHttp { status: 404 }));
        assert_eq!(fetcher.transport().seen().len(), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_failure() {
        let transport = ScriptedTransport::new().route("/jobs", vec![(503, BODY), (200, "short")]);
        let fetcher = fetcher(transport);

        let outcome = fetcher.fetch(&request().attempts(3)).await;
        assert_eq!(outcome, Err(FetchFailure::Thin { bytes: 5 }));
        assert_eq!(fetcher.transport().seen().len(), 3);
    }

    #[tokio::test]
    async fn test_transport_error_is_retried() {
        let transport = ScriptedTransport::new().route_error("/jobs", "connection reset");
        let fetcher = fetcher(transport);

        let outcome = fetcher.fetch(&request().attempts(2)).await;
        assert_eq!(outcome, Err(FetchFailure::Transport("connection reset".into())));
        assert_eq!(fetcher.transport().seen().len(), 2);
    }

    #[tokio::test]
    async fn test_proxy_and_identity_drawn_per_attempt() {
        let transport = ScriptedTransport::new().route("/jobs", vec![(403, ""), (403, ""), (200, BODY)]);
        let fetcher = Fetcher::new(
            transport,
            Arc::new(RotatingProxies::new(vec![
                "http://p1:8000".into(),
                "http://p2:8000".into(),
            ])),
            Arc::new(Pacer::new(Duration::ZERO)),
        )
        .with_policy(fast_policy());

        fetcher.fetch(&request()).await.unwrap();
        let proxies: Vec<_> = fetcher
            .transport()
            .seen()
            .into_iter()
            .map(|s| s.proxy.unwrap())
            .collect();
        assert_eq!(proxies, vec!["http://p1:8000", "http://p2:8000", "http://p1:8000"]);
        assert!(fetcher
            .transport()
            .seen()
            .iter()
            .all(|s| s.user_agent.as_deref().is_some_and(|ua| ua.contains("Mobile"))));
    }

    #[tokio::test]
    async fn test_every_attempt_is_paced() {
        let gap = Duration::from_millis(120);
        let transport = ScriptedTransport::new().route("/jobs", vec![(500, ""), (200, BODY)]);
        let fetcher = Fetcher::new(transport, Arc::new(NoProxy), Arc::new(Pacer::new(gap)))
            .with_policy(RetryPolicy {
                base_delay: Duration::from_millis(1),
                max_jitter: Duration::ZERO,
                ..fast_policy()
            });

        fetcher.fetch(&request()).await.unwrap();
        let seen = fetcher.transport().seen();
        assert_eq!(seen.len(), 2);
        assert!(seen[1].at - seen[0].at + Duration::from_millis(2) >= gap);
    }
}
