//! Error types for tickbatch.
//!
//! Batch failures are delivered through every caller's future, never raised
//! from `enqueue` itself. One failed batch yields one error value that is
//! cloned to each entry, so callers can tell they shared the same failure.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Error type returned by user-supplied workers and reducers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A user error shared between every entry of one batch.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Step of a dispatch that panicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Folding the batch inputs with the reducer.
    Reduce,
    /// Invoking the worker.
    Work,
    /// Awaiting a deferred worker result.
    Await,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Reduce => write!(f, "reduce"),
            Stage::Work => write!(f, "work"),
            Stage::Await => write!(f, "await"),
        }
    }
}

/// Errors observed by callers awaiting an enqueued request.
#[derive(Debug, Clone, Error)]
pub enum BatchError {
    #[error("worker failed: {0}")]
    Worker(SharedError),

    #[error("reducer failed: {0}")]
    Reducer(SharedError),

    #[error("{stage} step panicked: {message}")]
    Panicked { stage: Stage, message: String },

    #[error("batch could not be scheduled: {0}")]
    Unscheduled(#[from] SchedulerError),

    #[error("batch was dropped before it settled")]
    Abandoned,
}

impl BatchError {
    pub(crate) fn worker(err: BoxError) -> Self {
        Self::Worker(Arc::from(err))
    }

    pub(crate) fn reducer(err: BoxError) -> Self {
        Self::Reducer(Arc::from(err))
    }

    /// Build a `Panicked` error from a `catch_unwind` payload.
    pub(crate) fn panicked(stage: Stage, payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked { stage, message }
    }

    /// The user error behind a worker or reducer failure, if any.
    pub fn source_error(&self) -> Option<&SharedError> {
        match self {
            Self::Worker(e) | Self::Reducer(e) => Some(e),
            _ => None,
        }
    }

    /// Returns true if both errors carry the same shared user error.
    pub fn same_failure(&self, other: &BatchError) -> bool {
        match (self.source_error(), other.source_error()) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Errors raised by a tick scheduler when it cannot run work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("no Tokio runtime is available on this thread")]
    NoRuntime,
}

/// Errors raised while parsing configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Unknown scheduler kind: {0}")]
    UnknownScheduler(String),

    #[error("Unknown log format: {0}")]
    UnknownLogFormat(String),

    #[error("Invalid config file: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payload_str_is_kept() {
        let err = BatchError::panicked(Stage::Work, Box::new("boom"));
        assert_eq!(err.to_string(), "work step panicked: boom");
    }

    #[test]
    fn panic_payload_string_is_kept() {
        let err = BatchError::panicked(Stage::Reduce, Box::new(String::from("bad fold")));
        assert!(matches!(err, BatchError::Panicked { stage: Stage::Reduce, ref message } if message == "bad fold"));
    }

    #[test]
    fn clones_share_the_same_failure() {
        let err = BatchError::worker("disk full".into());
        let copy = err.clone();
        assert!(err.same_failure(&copy));

        let other = BatchError::worker("disk full".into());
        assert!(!err.same_failure(&other));
    }

    #[test]
    fn scheduler_error_converts() {
        let err: BatchError = SchedulerError::NoRuntime.into();
        assert!(matches!(err, BatchError::Unscheduled(SchedulerError::NoRuntime)));
    }
}
