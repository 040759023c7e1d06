//! tickbatch
//!
//! Coalesces every request issued during one tick of a Tokio runtime into a
//! single worker call, then hands the one result back to every caller.
//!
//! # Model
//!
//! - **Enqueue**: callers add an input and get a future for the batch result.
//! - **Tick**: the first input into an empty queue arms a [`tick::TickScheduler`].
//! - **Flush**: inputs are folded with the reducer (default `+`), the worker
//!   runs once, and its result (immediate or deferred) settles every caller.
//!
//! Failures from the reducer or worker reject every caller of that batch
//! with the same error. Later batches are unaffected.
//!
//! ```no_run
//! use tickbatch::{Batcher, WorkerOutput};
//!
//! # async fn demo() {
//! let batcher = Batcher::new(|total: u64| WorkerOutput::ready(total));
//! let a = batcher.enqueue(3);
//! let b = batcher.enqueue(3);
//! let c = batcher.enqueue(3);
//! assert_eq!(c.await.unwrap(), 9);
//! assert_eq!(a.await.unwrap(), 9);
//! assert_eq!(b.await.unwrap(), 9);
//! # }
//! ```

pub mod batcher;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod tick;

pub use batcher::{BatchResult, BatchStats, Batcher, BatcherBuilder, Settled, WorkerOutput};
pub use config::{BatcherConfig, EnvConfig};
pub use error::{BatchError, BoxError, ConfigError, SchedulerError, SharedError, Stage};
pub use tick::{next_tick, ManualScheduler, NextTick, SchedulerKind, TickScheduler, Timer};
