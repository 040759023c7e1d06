//! Span utilities for batch dispatch tracing.

use tracing::{info_span, Span};

/// Extension trait for adding context to spans.
pub trait SpanExt {
    /// Record the result of an operation into the span.
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display;
}

impl SpanExt for Span {
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(_) => {
                self.record("status", "ok");
            }
            Err(e) => {
                self.record("status", "error");
                self.record("error.message", e.to_string().as_str());
            }
        }
    }
}

/// Factory for the span wrapping one flush.
pub struct BatchSpan;

impl BatchSpan {
    /// Fields included:
    /// - `batcher`: name of the batcher being flushed
    /// - `batch_size`: number of requests folded together
    /// - `status`, `error.message`: filled in by `SpanExt::record_result`
    pub fn new(batcher: &str, batch_size: usize) -> Span {
        info_span!(
            "batch_dispatch",
            batcher = %batcher,
            batch_size = batch_size,
            status = tracing::field::Empty,
            error.message = tracing::field::Empty,
        )
    }
}
