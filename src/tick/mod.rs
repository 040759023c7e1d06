//! Tick scheduling for batch flushes.
//!
//! A [`TickScheduler`] decides when an armed batch is flushed relative to
//! other work on the runtime. The flush must run after the arming caller has
//! finished its current synchronous work and after tasks that were already
//! runnable, so that requests those tasks enqueue still join the batch.
//!
//! Strategies:
//!
//! - [`NextTick`]: spawn, yield once, then flush. Lowest latency.
//! - [`Timer`]: spawn, sleep, then flush. Coarser, batches more.
//! - [`ManualScheduler`]: flush on command, for tests.

mod kind;
mod manual;
mod next_tick;
mod timer;

use futures::future::BoxFuture;

use crate::error::SchedulerError;

pub use kind::SchedulerKind;
pub use manual::ManualScheduler;
pub use next_tick::{next_tick, NextTick};
pub use timer::Timer;

/// A flush callback handed to a scheduler. Runs exactly once.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Scheduling capability injected into a batcher.
pub trait TickScheduler: Send + Sync {
    /// Arrange for `task` to run once the current tick has completed.
    fn schedule(&self, task: Task) -> Result<(), SchedulerError>;

    /// Drive a deferred worker continuation without blocking the caller.
    fn spawn(&self, continuation: BoxFuture<'static, ()>) -> Result<(), SchedulerError> {
        spawn_on_current(continuation)
    }

    /// Short strategy name for logs.
    fn name(&self) -> &'static str;
}

/// Spawn onto the runtime driving the current thread.
pub(crate) fn spawn_on_current(
    continuation: BoxFuture<'static, ()>,
) -> Result<(), SchedulerError> {
    let handle = tokio::runtime::Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
    handle.spawn(continuation);
    Ok(())
}
