//! Tick-coalescing batcher.
//!
//! Every `enqueue` issued before the armed flush runs joins the same batch.
//! The flush folds the batch inputs with the reducer, calls the worker once
//! and hands the one result to every caller.

mod dispatch;
mod entry;
mod output;
mod stats;

use std::ops::Add;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::BatcherConfig;
use crate::error::BoxError;
use crate::tick::{SchedulerKind, TickScheduler};

use entry::PendingEntry;
use stats::StatsCounters;

pub use entry::{BatchResult, Settled};
pub use output::WorkerOutput;
pub use stats::BatchStats;

type Reducer<I> = Box<dyn Fn(I, I) -> Result<I, BoxError> + Send + Sync>;
type Worker<I, O> = Box<dyn Fn(I) -> WorkerOutput<O> + Send + Sync>;

const DEFAULT_NAME: &str = "batcher";

fn lift_reducer<I, R>(reducer: R) -> Reducer<I>
where
    R: Fn(I, I) -> I + Send + Sync + 'static,
{
    Box::new(move |a: I, b: I| -> Result<I, BoxError> { Ok(reducer(a, b)) })
}

struct Inner<I, O> {
    name: String,
    reducer: Reducer<I>,
    worker: Worker<I, O>,
    queue: Mutex<Vec<PendingEntry<I, O>>>,
    scheduler: Arc<dyn TickScheduler>,
    stats: StatsCounters,
}

/// Coalesces requests issued within one tick into a single worker call.
///
/// Cloning is cheap and clones share one queue.
pub struct Batcher<I, O> {
    inner: Arc<Inner<I, O>>,
}

impl<I, O> Clone for Batcher<I, O> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<I, O> std::fmt::Debug for Batcher<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batcher")
            .field("name", &self.inner.name)
            .field("scheduler", &self.inner.scheduler.name())
            .finish()
    }
}

impl<I, O> Batcher<I, O>
where
    I: Send + 'static,
    O: Clone + Send + 'static,
{
    /// Batcher that sums batch inputs with `+`.
    pub fn new<W>(worker: W) -> Self
    where
        I: Add<Output = I>,
        W: Fn(I) -> WorkerOutput<O> + Send + Sync + 'static,
    {
        Self::builder(worker).build()
    }

    /// Batcher folding inputs with `reducer`.
    pub fn with_reducer<W, R>(worker: W, reducer: R) -> Self
    where
        W: Fn(I) -> WorkerOutput<O> + Send + Sync + 'static,
        R: Fn(I, I) -> I + Send + Sync + 'static,
    {
        Self::builder_with_reducer(worker, reducer).build()
    }

    /// Batcher folding inputs with a reducer that can fail.
    ///
    /// A reducer error rejects every caller in the batch.
    pub fn with_try_reducer<W, R>(worker: W, reducer: R) -> Self
    where
        W: Fn(I) -> WorkerOutput<O> + Send + Sync + 'static,
        R: Fn(I, I) -> Result<I, BoxError> + Send + Sync + 'static,
    {
        BatcherBuilder::from_parts(Box::new(worker), Box::new(reducer)).build()
    }

    /// Summing batcher configured from `config`.
    pub fn from_config<W>(config: &BatcherConfig, worker: W) -> Self
    where
        I: Add<Output = I>,
        W: Fn(I) -> WorkerOutput<O> + Send + Sync + 'static,
    {
        Self::builder(worker).config(config).build()
    }

    /// Builder whose reducer defaults to `+`.
    pub fn builder<W>(worker: W) -> BatcherBuilder<I, O>
    where
        I: Add<Output = I>,
        W: Fn(I) -> WorkerOutput<O> + Send + Sync + 'static,
    {
        Self::builder_with_reducer(worker, |a, b| a + b)
    }

    /// Builder for input types without a default reducer.
    pub fn builder_with_reducer<W, R>(worker: W, reducer: R) -> BatcherBuilder<I, O>
    where
        W: Fn(I) -> WorkerOutput<O> + Send + Sync + 'static,
        R: Fn(I, I) -> I + Send + Sync + 'static,
    {
        BatcherBuilder::from_parts(Box::new(worker), lift_reducer(reducer))
    }

    /// Queue `input` for the current batch.
    ///
    /// The first request into an empty queue arms the scheduler; later ones
    /// ride that flush. The returned future resolves with the batch result.
    pub fn enqueue(&self, input: I) -> Settled<O> {
        let (entry, settled) = PendingEntry::new(input);
        let first = {
            let mut queue = self.inner.queue.lock();
            queue.push(entry);
            queue.len() == 1
        };
        if first {
            self.arm();
        }
        settled
    }

    /// Hand the flush to the scheduler.
    ///
    /// If arming fails, every queued entry is rejected, including ones other
    /// threads pushed behind the first entry while this call was running.
    /// Those threads saw a non-empty queue and never armed, so rejecting
    /// here is the only way they settle. The emptied queue lets the next
    /// enqueue arm again.
    fn arm(&self) {
        tracing::trace!(
            batcher = %self.inner.name,
            scheduler = self.inner.scheduler.name(),
            "arming flush"
        );
        let inner = Arc::clone(&self.inner);
        if let Err(err) = self.inner.scheduler.schedule(Box::new(move || inner.dispatch())) {
            tracing::warn!(batcher = %self.inner.name, error = %err, "flush could not be armed");
            self.inner.reject_pending(err.into());
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Name of the tick strategy in use.
    pub fn scheduler_name(&self) -> &'static str {
        self.inner.scheduler.name()
    }

    pub fn stats(&self) -> BatchStats {
        self.inner.stats.snapshot()
    }
}

/// Assembles a [`Batcher`].
pub struct BatcherBuilder<I, O> {
    name: String,
    reducer: Reducer<I>,
    worker: Worker<I, O>,
    scheduler: Option<Arc<dyn TickScheduler>>,
}

impl<I, O> BatcherBuilder<I, O>
where
    I: Send + 'static,
    O: Clone + Send + 'static,
{
    fn from_parts(worker: Worker<I, O>, reducer: Reducer<I>) -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            reducer,
            worker,
            scheduler: None,
        }
    }

    /// Replace the reducer.
    pub fn reducer<R>(mut self, reducer: R) -> Self
    where
        R: Fn(I, I) -> I + Send + Sync + 'static,
    {
        self.reducer = lift_reducer(reducer);
        self
    }

    /// Replace the reducer with one that can fail.
    pub fn try_reducer<R>(mut self, reducer: R) -> Self
    where
        R: Fn(I, I) -> Result<I, BoxError> + Send + Sync + 'static,
    {
        self.reducer = Box::new(reducer);
        self
    }

    /// Use `scheduler` instead of the [`SchedulerKind::Auto`] choice.
    pub fn scheduler(mut self, scheduler: Arc<dyn TickScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Label used in logs and spans.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Apply name and scheduler strategy from configuration.
    pub fn config(self, config: &BatcherConfig) -> Self {
        let scheduler = config.scheduler.build();
        self.name(config.name.clone()).scheduler(scheduler)
    }

    /// Without an explicit scheduler the strategy is resolved against the
    /// runtime active here: next-tick on a current-thread runtime, the timer
    /// on a multi-thread one.
    pub fn build(self) -> Batcher<I, O> {
        let scheduler: Arc<dyn TickScheduler> = match self.scheduler {
            Some(scheduler) => scheduler,
            None => SchedulerKind::Auto.build(),
        };
        Batcher {
            inner: Arc::new(Inner {
                name: self.name,
                reducer: self.reducer,
                worker: self.worker,
                queue: Mutex::new(Vec::new()),
                scheduler,
                stats: StatsCounters::default(),
            }),
        }
    }
}

#[cfg(test)]
#[path = "batcher_tests.rs"]
mod tests;
