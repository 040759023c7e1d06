//! Scheduler strategy selection.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::runtime::{Handle, RuntimeFlavor};

use super::timer::DEFAULT_TIMER_DELAY;
use super::{next_tick, TickScheduler, Timer};
use crate::error::ConfigError;

/// Which tick scheduler a batcher should use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SchedulerKind {
    /// Pick the best strategy for the runtime active at build time.
    #[default]
    Auto,
    /// Yield once, then flush.
    NextTick,
    /// Sleep for `delay_ms`, then flush.
    Timer {
        #[serde(default = "default_delay_ms")]
        delay_ms: u64,
    },
}

fn default_delay_ms() -> u64 {
    DEFAULT_TIMER_DELAY.as_millis() as u64
}

impl SchedulerKind {
    /// Timer strategy with the given delay.
    pub fn timer(delay: Duration) -> Self {
        Self::Timer { delay_ms: delay.as_millis() as u64 }
    }

    /// Resolve `Auto` against the current runtime.
    ///
    /// A current-thread runtime orders spawned tasks FIFO behind the caller,
    /// which is what `NextTick` relies on. Other flavours run tasks in
    /// parallel, so the timer is used. Without a runtime `NextTick` is
    /// chosen and arming reports the missing runtime per batch.
    pub fn resolve(self) -> Self {
        match self {
            Self::Auto => match Handle::try_current().map(|h| h.runtime_flavor()) {
                Ok(RuntimeFlavor::CurrentThread) | Err(_) => Self::NextTick,
                Ok(_) => Self::Timer { delay_ms: default_delay_ms() },
            },
            other => other,
        }
    }

    /// Build the scheduler this kind describes.
    pub fn build(self) -> Arc<dyn TickScheduler> {
        match self.resolve() {
            Self::Timer { delay_ms } => Arc::new(Timer::new(Duration::from_millis(delay_ms))),
            Self::NextTick | Self::Auto => next_tick(),
        }
    }
}

impl FromStr for SchedulerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "next-tick" | "next_tick" | "nexttick" => Ok(Self::NextTick),
            "timer" => Ok(Self::Timer { delay_ms: default_delay_ms() }),
            other => Err(ConfigError::UnknownScheduler(other.to_string())),
        }
    }
}
