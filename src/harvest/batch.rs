//! Bounded batch fan-out
//!
//! Items are processed in fixed-size groups: every task of a group is started
//! together on the current task and the group is awaited as a whole before the
//! next one starts. Nothing is spawned, so shared counters are only touched
//! between groups.

use futures::future::join_all;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Maps `items` through `task` in batches of at most `concurrency`
///
/// Stops as soon as `target` results satisfy `counts`. A batch never holds
/// more items than are still needed to reach the target, so the target is
/// never overshot even when every task succeeds.
pub async fn run_bounded<T, R, F, Fut>(
    items: Vec<T>,
    concurrency: usize,
    target: usize,
    mut task: F,
    counts: fn(&R) -> bool,
) -> Vec<R>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = R>,
{
    let concurrency = concurrency.max(1);
    let mut queue = items.into_iter();
    let mut results = Vec::new();
    let mut done = 0usize;

    while done < target {
        let batch_size = concurrency.min(target - done);
        let batch: Vec<Fut> = queue.by_ref().take(batch_size).map(&mut task).collect();
        if batch.is_empty() {
            break;
        }

        for result in join_all(batch).await {
            if counts(&result) {
                done += 1;
            }
            results.push(result);
        }
    }

    results
}

/// Sleeps for a uniformly random duration in `[min_ms, max_ms]`
pub async fn random_delay(min_ms: u64, max_ms: u64) {
    let max_ms = max_ms.max(min_ms);
    let millis = if max_ms > min_ms {
        rand::rng().random_range(min_ms..=max_ms)
    } else {
        min_ms
    };

    if millis > 0 {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}
