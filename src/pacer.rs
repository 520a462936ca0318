//! Process-wide pacing of outbound requests.
//!
//! A single [`Pacer`] is shared by `Arc` with every fetch, whichever worker
//! issues it. It wraps a direct `governor` rate limiter whose quota replenishes
//! one permit per `min_gap` with a burst of one, so any two releases are at
//! least `min_gap` apart.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

pub struct Pacer {
    min_gap: Duration,
    /// `None` when `min_gap` is zero and pacing is disabled.
    limiter: Option<DefaultDirectRateLimiter>,
}

impl Pacer {
    pub fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            limiter: Quota::with_period(min_gap).map(RateLimiter::direct),
        }
    }

    pub fn min_gap(&self) -> Duration {
        self.min_gap
    }

    /// Wait for the next permit and return the instant it was granted.
    ///
    /// # Returns
    ///
    /// The release instant, for callers that want to log or measure spacing.
    pub async fn wait(&self) -> Instant {
        if let Some(limiter) = &self.limiter {
            if limiter.check().is_err() {
                trace!(min_gap = ?self.min_gap, "pacing");
                limiter.until_ready().await;
            }
        }
        Instant::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;

    /// Clock skew allowed between the limiter's clock and tokio's.
    const SLACK: Duration = Duration::from_millis(2);

    #[tokio::test]
    async fn test_first_wait_is_immediate() {
        let pacer = Pacer::new(Duration::from_secs(5));
        let t0 = Instant::now();
        pacer.wait().await;
        assert!(t0.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_concurrent_waits_are_separated() {
        let gap = Duration::from_millis(30);
        let pacer = Pacer::new(gap);

        let mut releases = join_all((0..6).map(|_| pacer.wait())).await;
        releases.sort();

        for pair in releases.windows(2) {
            assert!(pair[1] - pair[0] + SLACK >= gap, "releases {:?} closer than {:?}", pair, gap);
        }
    }

    #[tokio::test]
    async fn test_waits_across_tasks_are_separated() {
        use std::sync::Arc;

        let gap = Duration::from_millis(20);
        let pacer = Arc::new(Pacer::new(gap));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pacer = Arc::clone(&pacer);
                tokio::spawn(async move { pacer.wait().await })
            })
            .collect();

        let mut releases = Vec::new();
        for h in handles {
            releases.push(h.await.unwrap());
        }
        releases.sort();
        for pair in releases.windows(2) {
            assert!(pair[1] - pair[0] + SLACK >= gap);
        }
    }

    #[tokio::test]
    async fn test_zero_gap_never_waits() {
        let pacer = Pacer::new(Duration::ZERO);
        let t0 = Instant::now();
        for _ in 0..50 {
            pacer.wait().await;
        }
        assert!(t0.elapsed() < Duration::from_millis(100));
    }
}
