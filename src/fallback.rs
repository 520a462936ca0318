//! Primary-then-secondary fallback, shared by listing discovery and detail
//! retrieval.
//!
//! The secondary is consulted when the primary fails outright, or when it
//! succeeds with a result judged insufficient (an empty key list, a thin
//! detail page). An insufficient primary result is kept if the secondary
//! then fails.

use std::fmt::Display;
use std::future::Future;
use tracing::{debug, warn};

/// Why the secondary was consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    PrimaryFailed,
    Insufficient,
}

pub async fn fallback_pair<T, E, P, PF, S, SF, N>(
    label: &str,
    primary: P,
    secondary: S,
    needs_fallback: N,
) -> Result<T, E>
where
    P: FnOnce() -> PF,
    PF: Future<Output = Result<T, E>>,
    S: FnOnce(Trigger) -> SF,
    SF: Future<Output = Result<T, E>>,
    N: Fn(&T) -> bool,
    E: Display,
{
    match primary().await {
        Ok(value) if !needs_fallback(&value) => Ok(value),
        Ok(value) => {
            warn!(what = label, "primary result insufficient; trying secondary");
            match secondary(Trigger::Insufficient).await {
                Ok(better) => Ok(better),
                Err(e) => {
                    debug!(what = label, error = %e, "secondary failed; keeping primary result");
                    Ok(value)
                }
            }
        }
        Err(e) => {
            warn!(what = label, error = %e, "primary failed; trying secondary");
            secondary(Trigger::PrimaryFailed).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    async fn run(
        primary: Result<Vec<u8>, String>,
        secondary: Result<Vec<u8>, String>,
        calls: &Cell<usize>,
        trigger: &Cell<Option<Trigger>>,
    ) -> Result<Vec<u8>, String> {
        fallback_pair(
            "test",
            move || async move { primary },
            move |t| {
                calls.set(calls.get() + 1);
                trigger.set(Some(t));
                async move { secondary }
            },
            |v: &Vec<u8>| v.is_empty(),
        )
        .await
    }

    #[tokio::test]
    async fn test_sufficient_primary_skips_secondary() {
        let calls = Cell::new(0);
        let trigger = Cell::new(None);
        let out = run(Ok(vec![1]), Ok(vec![2]), &calls, &trigger).await;
        assert_eq!(out, Ok(vec![1]));
        assert_eq!(calls.get(), 0);
    }

    #[tokio::test]
    async fn test_insufficient_primary_uses_secondary() {
        let calls = Cell::new(0);
        let trigger = Cell::new(None);
        let out = run(Ok(vec![]), Ok(vec![2]), &calls, &trigger).await;
        assert_eq!(out, Ok(vec![2]));
        assert_eq!(calls.get(), 1);
        assert_eq!(trigger.get(), Some(Trigger::Insufficient));
    }

    #[tokio::test]
    async fn test_insufficient_primary_kept_when_secondary_fails() {
        let calls = Cell::new(0);
        let trigger = Cell::new(None);
        let out = run(Ok(vec![]), Err("down".into()), &calls, &trigger).await;
        assert_eq!(out, Ok(vec![]));
    }

    #[tokio::test]
    async fn test_failed_primary_returns_secondary_outcome() {
        let calls = Cell::new(0);
        let trigger = Cell::new(None);
        let out = run(Err("blocked".into()), Err("also blocked".into()), &calls, &trigger).await;
        assert_eq!(out, Err("also blocked".to_string()));
        assert_eq!(trigger.get(), Some(Trigger::PrimaryFailed));

        let out = run(Err("blocked".into()), Ok(vec![3]), &calls, &trigger).await;
        assert_eq!(out, Ok(vec![3]));
        assert_eq!(calls.get(), 2);
    }
}
