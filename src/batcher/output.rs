//! Tagged worker results.

use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::BoxError;

/// What a worker hands back for one batch.
///
/// The batcher settles `Immediate` results inside the flush and spawns a
/// continuation for `Deferred` ones.
pub enum WorkerOutput<O> {
    Immediate(Result<O, BoxError>),
    Deferred(BoxFuture<'static, Result<O, BoxError>>),
}

impl<O> WorkerOutput<O> {
    /// Immediate success.
    pub fn ready(value: O) -> Self {
        Self::Immediate(Ok(value))
    }

    /// Immediate failure.
    pub fn failed(err: impl Into<BoxError>) -> Self {
        Self::Immediate(Err(err.into()))
    }

    /// Result available once `fut` completes.
    pub fn deferred<F>(fut: F) -> Self
    where
        F: Future<Output = Result<O, BoxError>> + Send + 'static,
    {
        Self::Deferred(fut.boxed())
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}

impl<O> From<Result<O, BoxError>> for WorkerOutput<O> {
    fn from(result: Result<O, BoxError>) -> Self {
        Self::Immediate(result)
    }
}

impl<O> std::fmt::Debug for WorkerOutput<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immediate(Ok(_)) => f.write_str("Immediate(Ok(..))"),
            Self::Immediate(Err(e)) => write!(f, "Immediate(Err({e}))"),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}
