//! Bounded worker pool draining detail targets.
//!
//! `concurrency` workers share one FIFO queue. Each pops a target, retrieves
//! it, and hands the record to the sink. Workers run as futures joined on the
//! caller's task, so pacing and the number of in-flight retrievals are the
//! only limits on parallelism.

use crate::models::Record;
use crate::outputs::RecordSink;
use futures::future::join_all;
use std::collections::VecDeque;
use std::fmt::Display;
use std::future::Future;
use std::ops::Add;
use std::sync::Mutex;
use tracing::{debug, error, info, instrument};

/// What one run of the pool did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub attempted: usize,
    pub emitted: usize,
    pub failed: usize,
}

impl Add for PoolStats {
    type Output = PoolStats;

    fn add(self, other: PoolStats) -> PoolStats {
        PoolStats {
            attempted: self.attempted + other.attempted,
            emitted: self.emitted + other.emitted,
            failed: self.failed + other.failed,
        }
    }
}

/// Retrieve every target (at most `cap` of them) with `concurrency` workers.
///
/// A failed target is logged and counted; it never stops the other workers.
///
/// # Arguments
///
/// * `targets` - Work items in intake order
/// * `cap` - Maximum number of targets taken from `targets`
/// * `concurrency` - Number of workers (0 is treated as 1)
/// * `retrieve` - Produces one record per target or a displayable failure
/// * `sink` - Receives each record exactly once
///
/// # Returns
///
/// Totals for the run, once the queue is empty and every worker has finished.
#[instrument(level = "info", skip_all, fields(queued = targets.len().min(cap), concurrency = concurrency))]
pub async fn run<T, F, Fut, E, K>(
    targets: Vec<T>,
    cap: usize,
    concurrency: usize,
    retrieve: F,
    sink: &K,
) -> PoolStats
where
    T: Display,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<Record, E>>,
    E: Display,
    K: RecordSink,
{
    let queue: Mutex<VecDeque<T>> = Mutex::new(targets.into_iter().take(cap).collect());
    let retrieve = &retrieve;
    let queue = &queue;

    let workers = (0..concurrency.max(1)).map(|worker| async move {
        let mut stats = PoolStats::default();
        loop {
            let next = match queue.lock() {
                Ok(mut q) => q.pop_front(),
                Err(e) => {
                    error!(worker, error = %e, "Work queue poisoned; worker stopping");
                    None
                }
            };
            let Some(target) = next else { break };

            let label = target.to_string();
            stats.attempted += 1;
            debug!(worker, target = %label, "Picked up target");
            match retrieve(target).await {
                Ok(record) => match sink.push(record).await {
                    Ok(()) => stats.emitted += 1,
                    Err(e) => {
                        error!(worker, target = %label, error = %e, "Failed to write record");
                        stats.failed += 1;
                    }
                },
                Err(e) => {
                    error!(worker, target = %label, error = %e, "Skipping target after all attempts failed");
                    stats.failed += 1;
                }
            }
        }
        debug!(worker, attempted = stats.attempted, "Worker finished");
        stats
    });

    let stats = join_all(workers)
        .await
        .into_iter()
        .fold(PoolStats::default(), |acc, s| acc + s);
    info!(
        attempted = stats.attempted,
        emitted = stats.emitted,
        failed = stats.failed,
        "Worker pool drained"
    );
    stats
}
