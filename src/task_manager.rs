//! Tracks detached delivery tasks so shutdown can wait for them.
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// A centralized tracker for spawned tasks.
///
/// This struct is responsible for:
/// - Spawning tasks and keeping their handles while they run.
/// - Reaping finished tasks so the set does not grow with every request.
/// - Draining the remaining tasks on shutdown, within a grace period.
#[derive(Clone, Debug, Default)]
pub struct TaskManager {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl TaskManager {
    /// Creates a new `TaskManager`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a new task and adds its handle to the manager.
    pub fn spawn<F>(&self, name: &'static str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        debug!(task_name = name, "Spawning task");
        let mut tasks = self.lock();
        while let Some(result) = tasks.try_join_next() {
            log_join_result(result);
        }
        tasks.spawn(future);
    }

    /// Number of tasks that have not been reaped yet.
    pub fn in_flight(&self) -> usize {
        let mut tasks = self.lock();
        while let Some(result) = tasks.try_join_next() {
            log_join_result(result);
        }
        tasks.len()
    }

    /// Waits for all tracked tasks, aborting whatever is still running once
    /// `grace` has elapsed. Returns the number of aborted tasks.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        let mut tasks = std::mem::take(&mut *self.lock());
        info!(
            "TaskManager shutting down. Waiting for {} tasks to complete...",
            tasks.len()
        );

        let drained = tokio::time::timeout(grace, async {
            while let Some(result) = tasks.join_next().await {
                log_join_result(result);
            }
        })
        .await;

        if drained.is_ok() {
            info!("All tasks shut down gracefully.");
            return 0;
        }

        let remaining = tasks.len();
        warn!(
            remaining,
            grace_seconds = grace.as_secs_f64(),
            "Grace period elapsed, aborting in-flight tasks."
        );
        tasks.shutdown().await;
        remaining
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        // A panic while holding the lock cannot leave the set inconsistent.
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn log_join_result(result: Result<(), JoinError>) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => debug!("Task was cancelled."),
        Err(e) => error!(error = %e, "Task panicked."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_shutdown_waits_for_running_tasks() {
        let manager = TaskManager::new();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let done = done.clone();
            manager.spawn("test", async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        let aborted = manager.shutdown(Duration::from_secs(5)).await;

        assert_eq!(aborted, 0);
        assert_eq!(done.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_shutdown_aborts_after_grace_period() {
        let manager = TaskManager::new();
        manager.spawn("quick", async {});
        manager.spawn("stuck", async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let aborted = manager.shutdown(Duration::from_millis(50)).await;

        assert_eq!(aborted, 1);
        assert_eq!(manager.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_finished_tasks_are_reaped() {
        let manager = TaskManager::new();
        manager.spawn("quick", async {});
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(manager.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_panicking_task_does_not_poison_manager() {
        let manager = TaskManager::new();
        manager.spawn("panics", async { panic!("boom") });
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(manager.in_flight(), 0);
        assert_eq!(manager.shutdown(Duration::from_millis(10)).await, 0);
    }
}
