//! Flush: drain the queue, reduce, run the worker, fan the result out.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{Instrument, Span};

use super::entry::{settle_all, BatchResult, SettleTx};
use super::{Inner, WorkerOutput};
use crate::error::{BatchError, BoxError, Stage};
use crate::telemetry::{BatchSpan, SpanExt};

impl<I, O> Inner<I, O>
where
    I: Send + 'static,
    O: Clone + Send + 'static,
{
    /// Run by the tick scheduler once per armed batch.
    pub(super) fn dispatch(self: &Arc<Self>) {
        // The swap decides batch membership: later enqueues re-arm.
        let batch = std::mem::take(&mut *self.queue.lock());
        let size = batch.len();
        if size == 0 {
            return;
        }
        self.stats.record_dispatch(size);

        let span = BatchSpan::new(&self.name, size);
        let mut inputs = Vec::with_capacity(size);
        let mut settles = Vec::with_capacity(size);
        for entry in batch {
            inputs.push(entry.input);
            settles.push(entry.settle);
        }

        let output = {
            let _enter = span.enter();
            self.reduce(inputs).and_then(|aggregate| self.work(aggregate))
        };
        match output {
            Ok(WorkerOutput::Immediate(result)) => {
                self.finish(&span, settles, result.map_err(BatchError::worker));
            }
            Ok(WorkerOutput::Deferred(fut)) => self.await_deferred(span, settles, fut),
            Err(err) => self.finish(&span, settles, Err(err)),
        }
    }

    /// Fold left to right. A single input never reaches the reducer.
    fn reduce(&self, inputs: Vec<I>) -> Result<I, BatchError> {
        let mut inputs = inputs.into_iter();
        let first = inputs.next().ok_or(BatchError::Abandoned)?;
        catch_unwind(AssertUnwindSafe(|| {
            inputs.try_fold(first, |acc, next| (self.reducer)(acc, next))
        }))
        .map_err(|payload| BatchError::panicked(Stage::Reduce, payload))?
        .map_err(BatchError::reducer)
    }

    fn work(&self, aggregate: I) -> Result<WorkerOutput<O>, BatchError> {
        catch_unwind(AssertUnwindSafe(|| (self.worker)(aggregate)))
            .map_err(|payload| BatchError::panicked(Stage::Work, payload))
    }

    fn await_deferred(
        self: &Arc<Self>,
        span: Span,
        settles: Vec<SettleTx<O>>,
        fut: BoxFuture<'static, Result<O, BoxError>>,
    ) {
        tracing::trace!(parent: &span, "worker result deferred");
        let slot = Arc::new(Mutex::new(Some(settles)));

        let inner = Arc::clone(self);
        let task_slot = Arc::clone(&slot);
        let task_span = span.clone();
        let continuation = async move {
            let result = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(result) => result.map_err(BatchError::worker),
                Err(payload) => Err(BatchError::panicked(Stage::Await, payload)),
            };
            let settles = task_slot.lock().take();
            if let Some(settles) = settles {
                inner.finish(&task_span, settles, result);
            }
        }
        .instrument(span.clone());

        if let Err(err) = self.scheduler.spawn(continuation.boxed()) {
            let settles = slot.lock().take();
            if let Some(settles) = settles {
                self.finish(&span, settles, Err(err.into()));
            }
        }
    }

    fn finish(&self, span: &Span, settles: Vec<SettleTx<O>>, result: BatchResult<O>) {
        span.record_result(&result);
        match &result {
            Ok(_) => tracing::debug!(parent: span, entries = settles.len(), "batch settled"),
            Err(err) => {
                self.stats.record_failure();
                tracing::warn!(parent: span, entries = settles.len(), error = %err, "batch failed");
            }
        }
        settle_all(settles, result);
    }

    /// Reject everything queued when a flush cannot be armed.
    pub(super) fn reject_pending(&self, err: BatchError) {
        let batch = std::mem::take(&mut *self.queue.lock());
        if batch.is_empty() {
            return;
        }
        self.stats.record_failure();
        let settles = batch.into_iter().map(|entry| entry.settle).collect();
        settle_all(settles, Err(err));
    }
}
