//! Coarse timer scheduler.
//!
//! Used where the runtime gives no ordering between freshly spawned tasks
//! and the caller (multi-threaded runtimes). Waiting on the timer wheel
//! costs latency but collects every request issued in the meantime.
//!
//! On those runtimes this is best effort: a caller whose synchronous frame
//! runs longer than the delay can still see the flush fire mid-frame and
//! have its requests split across two batches.

use std::time::Duration;

use super::{Task, TickScheduler};
use crate::error::SchedulerError;

/// Default delay before a timer flush.
pub const DEFAULT_TIMER_DELAY: Duration = Duration::from_millis(1);

/// Flushes after a fixed delay on the current runtime.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    delay: Duration,
}

impl Timer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new(DEFAULT_TIMER_DELAY)
    }
}

impl TickScheduler for Timer {
    fn schedule(&self, task: Task) -> Result<(), SchedulerError> {
        let handle =
            tokio::runtime::Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        let delay = self.delay;
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "timer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn default_delay() {
        assert_eq!(Timer::default().delay(), Duration::from_millis(1));
    }

    #[tokio::test]
    async fn task_runs_after_delay() {
        let ran = Arc::new(AtomicBool::new(false));
        let r = Arc::clone(&ran);
        Timer::new(Duration::from_millis(5))
            .schedule(Box::new(move || r.store(true, Ordering::SeqCst)))
            .unwrap();

        tokio::task::yield_now().await;
        assert!(!ran.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(ran.load(Ordering::SeqCst));
    }
}
