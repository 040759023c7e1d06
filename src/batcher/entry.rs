//! Pending entries and the caller-facing settle future.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::BatchError;

/// Outcome delivered to each caller of one batch.
pub type BatchResult<O> = Result<O, BatchError>;

/// Settle handle for one caller.
pub(crate) type SettleTx<O> = oneshot::Sender<BatchResult<O>>;

/// A request waiting for the next flush.
pub(crate) struct PendingEntry<I, O> {
    pub input: I,
    pub settle: SettleTx<O>,
}

impl<I, O> PendingEntry<I, O> {
    pub fn new(input: I) -> (Self, Settled<O>) {
        let (settle, rx) = oneshot::channel();
        (Self { input, settle }, Settled { rx })
    }
}

/// Future returned by [`Batcher::enqueue`](super::Batcher::enqueue).
///
/// Resolves once with the result of the batch the request was folded into.
/// Dropping it does not withdraw the request from its batch.
#[must_use = "the request is dispatched either way; await this to observe its result"]
#[derive(Debug)]
pub struct Settled<O> {
    rx: oneshot::Receiver<BatchResult<O>>,
}

impl<O> Future for Settled<O> {
    type Output = BatchResult<O>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(BatchError::Abandoned)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Settle every entry with clones of one result.
pub(crate) fn settle_all<O: Clone>(mut settles: Vec<SettleTx<O>>, result: BatchResult<O>) {
    let Some(last) = settles.pop() else { return };
    for tx in settles {
        // Send fails only if the caller dropped its future.
        let _ = tx.send(result.clone());
    }
    let _ = last.send(result);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dropped_settle_reports_abandoned() {
        let (entry, settled) = PendingEntry::<u32, u32>::new(1);
        drop(entry);
        assert!(matches!(settled.await, Err(BatchError::Abandoned)));
    }

    #[tokio::test]
    async fn settle_all_reaches_every_entry() {
        let (entries, futures): (Vec<_>, Vec<_>) =
            (0..4).map(PendingEntry::<u32, String>::new).unzip();
        let settles = entries.into_iter().map(|e| e.settle).collect();

        settle_all(settles, Ok("done".to_string()));

        for fut in futures {
            assert_eq!(fut.await.unwrap(), "done");
        }
    }

    #[test]
    fn settled_stays_pending_until_sent() {
        let (entry, settled) = PendingEntry::<u32, u32>::new(1);
        let mut settled = tokio_test::task::spawn(settled);
        tokio_test::assert_pending!(settled.poll());

        settle_all(vec![entry.settle], Ok(42));
        assert!(settled.is_woken());
        assert_eq!(tokio_test::assert_ready!(settled.poll()).unwrap(), 42);
    }

    #[test]
    fn settle_all_tolerates_dropped_receivers() {
        let (entry, settled) = PendingEntry::<u32, u32>::new(1);
        drop(settled);
        settle_all(vec![entry.settle], Ok(5));
    }
}
