//! Post-continuation scheduler.
//!
//! Spawning puts the flush behind every task already in the runtime's run
//! queue. Yielding once more pushes it behind tasks those made runnable, so
//! chained continuations from the arming tick still reach the queue before
//! it is drained.

use std::sync::{Arc, OnceLock};

use super::{Task, TickScheduler};
use crate::error::SchedulerError;

/// Flushes after one cooperative yield on the current runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct NextTick;

impl TickScheduler for NextTick {
    fn schedule(&self, task: Task) -> Result<(), SchedulerError> {
        let handle =
            tokio::runtime::Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        handle.spawn(async move {
            tokio::task::yield_now().await;
            task();
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "next-tick"
    }
}

static SHARED: OnceLock<Arc<NextTick>> = OnceLock::new();

/// Process-wide [`NextTick`] instance, created on first use.
///
/// Holds no batch state, so every batcher can share it.
pub fn next_tick() -> Arc<NextTick> {
    Arc::clone(SHARED.get_or_init(|| Arc::new(NextTick)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn shared_instance_is_reused() {
        assert!(Arc::ptr_eq(&next_tick(), &next_tick()));
    }

    #[test]
    fn schedule_without_runtime_fails() {
        let result = NextTick.schedule(Box::new(|| {}));
        assert_eq!(result.unwrap_err(), SchedulerError::NoRuntime);
    }

    #[tokio::test]
    async fn task_runs_after_already_spawned_tasks() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let o = Arc::clone(&order);
        NextTick
            .schedule(Box::new(move || o.lock().push("flush")))
            .unwrap();

        let o = Arc::clone(&order);
        let spawned = tokio::spawn(async move { o.lock().push("spawned") });

        order.lock().push("sync");
        spawned.await.unwrap();
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        assert_eq!(*order.lock(), vec!["sync", "spawned", "flush"]);
    }

    #[tokio::test]
    async fn task_runs_exactly_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&runs);
        NextTick
            .schedule(Box::new(move || {
                r.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
