// Task group for one crawl cycle's reconciliation fan-out.
//
// Every task is spawned on the tokio runtime right away; `join_all` is the
// barrier that ends the cycle. An optional semaphore caps how many run at once.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub struct ReconcilePool {
    tasks: JoinSet<()>,
    limit: Option<Arc<Semaphore>>,
}

impl ReconcilePool {
    /// `None` means no cap. A cap of zero is treated as one.
    pub fn new(max_concurrent: Option<usize>) -> Self {
        Self {
            tasks: JoinSet::new(),
            limit: max_concurrent.map(|n| Arc::new(Semaphore::new(n.max(1)))),
        }
    }

    /// Tasks spawned and not yet joined.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let limit = self.limit.clone();
        self.tasks.spawn(async move {
            // Held until the task finishes. The semaphore is never closed.
            let _permit = match limit {
                Some(sem) => sem.acquire_owned().await.ok(),
                None => None,
            };
            task.await;
        });
    }

    /// Wait for every spawned task. Returns how many panicked.
    pub async fn join_all(mut self) -> usize {
        let mut panicked = 0;
        while let Some(res) = self.tasks.join_next().await {
            if let Err(e) = res {
                tracing::error!("Reconciliation task failed: {e}");
                panicked += 1;
            }
        }
        panicked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_join_waits_for_all_tasks() {
        let done = Arc::new(AtomicUsize::new(0));
        let mut pool = ReconcilePool::new(None);
        for i in 0..20u64 {
            let done = done.clone();
            pool.spawn(async move {
                tokio::time::sleep(Duration::from_millis(20 - i)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(pool.pending(), 20);
        assert_eq!(pool.join_all().await, 0);
        assert_eq!(done.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn test_cap_limits_concurrency() {
        let peak = Arc::new(AtomicUsize::new(0));
        let running = Arc::new(AtomicUsize::new(0));
        let mut pool = ReconcilePool::new(Some(2));
        for _ in 0..8 {
            let peak = peak.clone();
            let running = running.clone();
            pool.spawn(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }
        pool.join_all().await;
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_panicking_task_is_counted() {
        let mut pool = ReconcilePool::new(Some(0));
        pool.spawn(async { panic!("boom") });
        pool.spawn(async {});
        assert_eq!(pool.join_all().await, 1);
    }

    #[tokio::test]
    async fn test_empty_pool_joins_immediately() {
        let pool = ReconcilePool::new(None);
        assert_eq!(pool.pending(), 0);
        assert_eq!(pool.join_all().await, 0);
    }
}
