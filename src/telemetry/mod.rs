//! Telemetry for tickbatch.
//!
//! Subscriber setup for host processes and the span wrapping each flush.

mod logging;
mod spans;

pub use logging::{init_from_env, init_logging, LogConfig, LogError, LogFormat, BATCH_TARGET};
pub use spans::{BatchSpan, SpanExt};
