//! Batch scheduler for bounded, rate-limited concurrent work
//!
//! This module handles:
//! - Splitting work into consecutive batches of a fixed width
//! - Running every item of a batch concurrently and waiting for all of them
//! - Spacing batch dispatches by a minimum interval
//! - Stopping at batch boundaries when the job is cancelled

use futures::future::join_all;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Returned when a scheduled run is cancelled before all batches finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "scheduled run cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Scheduler running an operation over items in rate-limited batches
///
/// The operation is infallible by type: each invocation must absorb its own
/// failure and return a substitute value, so one bad item can never abort
/// the batch it belongs to.
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    /// Number of items dispatched together
    concurrency: usize,

    /// Minimum time between the dispatch of consecutive batches
    min_interval: Duration,
}

impl BatchScheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `concurrency` - Batch width; values below 1 are raised to 1
    /// * `min_interval` - Minimum spacing between batch dispatches
    pub fn new(concurrency: usize, min_interval: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            min_interval,
        }
    }

    /// Returns the batch width
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Returns the minimum spacing between batch dispatches
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Runs `op` over every item and returns the outputs in input order
    ///
    /// # Arguments
    ///
    /// * `items` - The items to process
    /// * `cancel` - Checked before every batch and during the inter-batch wait
    /// * `op` - The operation, invoked exactly once per item
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<O>)` - One output per item, index-aligned with `items`
    /// * `Err(Cancelled)` - The token fired before every batch was dispatched
    pub async fn run<I, O, F, Fut>(
        &self,
        items: Vec<I>,
        cancel: &CancellationToken,
        op: F,
    ) -> Result<Vec<O>, Cancelled>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = O>,
    {
        let total = items.len();
        let mut outputs = Vec::with_capacity(total);
        let mut last_dispatch: Option<Instant> = None;
        let mut pending = items.into_iter().peekable();
        let mut batch_index = 0usize;

        while pending.peek().is_some() {
            if let Some(previous) = last_dispatch {
                let ready_at = previous + self.min_interval;
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("Cancelled while waiting to dispatch batch {}", batch_index);
                        return Err(Cancelled);
                    }
                    _ = tokio::time::sleep_until(ready_at) => {}
                }
            }

            if cancel.is_cancelled() {
                tracing::info!("Cancelled before dispatching batch {}", batch_index);
                return Err(Cancelled);
            }

            let batch: Vec<I> = pending.by_ref().take(self.concurrency).collect();
            tracing::debug!(
                "Dispatching batch {} ({} items, {}/{} done)",
                batch_index,
                batch.len(),
                outputs.len(),
                total
            );

            last_dispatch = Some(Instant::now());
            let results = join_all(batch.into_iter().map(&op)).await;
            outputs.extend(results);
            batch_index += 1;
        }

        Ok(outputs)
    }
}

impl Default for BatchScheduler {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(3000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_empty_input() {
        let scheduler = BatchScheduler::new(3, Duration::ZERO);
        let out: Vec<u32> = scheduler
            .run(Vec::<u32>::new(), &CancellationToken::new(), |i| async move { i })
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_preserved_regardless_of_completion_order() {
        let scheduler = BatchScheduler::new(4, Duration::ZERO);
        let calls = Arc::new(AtomicUsize::new(0));

        let items: Vec<u64> = (0..10).collect();
        let out = scheduler
            .run(items.clone(), &CancellationToken::new(), |i| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    // Later items finish first within each batch
                    tokio::time::sleep(Duration::from_millis(100 - i * 5)).await;
                    i * 10
                }
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 10);
        assert_eq!(out, items.iter().map(|i| i * 10).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn test_batches_respect_min_interval() {
        let interval = Duration::from_millis(3000);
        let scheduler = BatchScheduler::new(2, interval);
        let starts = Arc::new(Mutex::new(Vec::new()));

        scheduler
            .run((0..5).collect::<Vec<usize>>(), &CancellationToken::new(), |i| {
                let starts = starts.clone();
                async move {
                    starts.lock().unwrap().push((i, Instant::now()));
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            })
            .await
            .unwrap();

        let starts = starts.lock().unwrap();
        let start_of = |i: usize| starts.iter().find(|(j, _)| *j == i).unwrap().1;

        // Batches are [0,1], [2,3], [4]
        assert!(start_of(2) - start_of(0) >= interval);
        assert!(start_of(4) - start_of(2) >= interval);
        // Items within a batch start together
        assert_eq!(start_of(0), start_of(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_width_is_bounded() {
        let scheduler = BatchScheduler::new(3, Duration::ZERO);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        scheduler
            .run((0..8).collect::<Vec<u32>>(), &CancellationToken::new(), |_| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                }
            })
            .await
            .unwrap();

        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_at_batch_boundary() {
        let scheduler = BatchScheduler::new(2, Duration::from_secs(1));
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let result = scheduler
            .run((0..6).collect::<Vec<u32>>(), &cancel, |_| {
                let calls = calls.clone();
                let cancel = cancel.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    cancel.cancel();
                }
            })
            .await;

        assert_eq!(result, Err(Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
