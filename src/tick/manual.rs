//! Scheduler that only flushes when told to.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{Task, TickScheduler};
use crate::error::SchedulerError;

/// Test scheduler: holds armed flushes until [`ManualScheduler::flush`].
///
/// Deferred continuations are still spawned on the current runtime.
#[derive(Default)]
pub struct ManualScheduler {
    tasks: Mutex<Vec<Task>>,
    armed: AtomicUsize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every task armed so far. Returns how many ran.
    ///
    /// Tasks armed while flushing wait for the next call.
    pub fn flush(&self) -> usize {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        let count = tasks.len();
        for task in tasks {
            task();
        }
        count
    }

    /// Tasks waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Total number of times `schedule` has been called.
    pub fn armed_count(&self) -> usize {
        self.armed.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .field("armed", &self.armed_count())
            .finish()
    }
}

impl TickScheduler for ManualScheduler {
    fn schedule(&self, task: Task) -> Result<(), SchedulerError> {
        self.armed.fetch_add(1, Ordering::AcqRel);
        self.tasks.lock().push(task);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "manual"
    }
}
