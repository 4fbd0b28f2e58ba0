//! Bounded worker pool shared by the validation and observation phases.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Run `work` over `items` with at most `workers` in flight.
///
/// Results come back in input order. A task that panics leaves `None` in
/// its slot and is logged; the other tasks are unaffected.
pub async fn run_bounded<T, R, F, Fut>(items: Vec<T>, workers: usize, work: F) -> Vec<Option<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let work = Arc::new(work);
    let mut results: Vec<Option<R>> = std::iter::repeat_with(|| None).take(items.len()).collect();
    let mut set = JoinSet::new();

    for (idx, item) in items.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let work = Arc::clone(&work);
        set.spawn(async move {
            // The semaphore is never closed, so acquire only fails if it were.
            let _permit = semaphore.acquire_owned().await.ok();
            (idx, (*work)(item).await)
        });
    }

    while let Some(res) = set.join_next().await {
        match res {
            Ok((idx, value)) => results[idx] = Some(value),
            Err(e) => tracing::error!(%e, "worker task failed"),
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn keeps_input_order() {
        let out = run_bounded(vec![30_u64, 1, 10], 3, |ms| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            ms * 2
        })
        .await;
        assert_eq!(out, vec![Some(60), Some(2), Some(20)]);
    }

    #[tokio::test]
    async fn never_exceeds_worker_bound() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (Arc::clone(&active), Arc::clone(&peak));
        let out = run_bounded((0..12).collect(), 2, move |_: i32| {
            let (active, peak) = (Arc::clone(&a), Arc::clone(&p));
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;
        assert_eq!(out.len(), 12);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
