//! Configuration loading from environment variables and TOML.
//!
//! All values are loaded from `TICKBATCH_*` environment variables with
//! sensible defaults. Invalid values fall back to defaults without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `TICKBATCH_SCHEDULER` | auto | `auto`, `next-tick` or `timer` |
//! | `TICKBATCH_TIMER_DELAY_MS` | 1 | Timer scheduler delay (ms) |
//! | `TICKBATCH_NAME` | batcher | Batcher label in logs |
//! | `TICKBATCH_LOG_LEVEL` | info | Log filter directive |
//! | `TICKBATCH_BATCH_LOG_LEVEL` | unset | Level for the `tickbatch` target only |
//! | `TICKBATCH_LOG_FORMAT` | json | `json` or `pretty` |

use serde::Deserialize;

use crate::error::ConfigError;
use crate::telemetry::{LogConfig, LogFormat};
use crate::tick::SchedulerKind;

/// Longest accepted timer delay.
const MAX_TIMER_DELAY_MS: u64 = 60_000;

/// Settings for one batcher.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BatcherConfig {
    pub name: String,
    pub scheduler: SchedulerKind,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            name: "batcher".to_string(),
            scheduler: SchedulerKind::Auto,
        }
    }
}

impl BatcherConfig {
    /// Parse a TOML document such as:
    ///
    /// ```toml
    /// name = "score-updates"
    ///
    /// [scheduler]
    /// kind = "timer"
    /// delay_ms = 5
    /// ```
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        toml::from_str(src).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// All configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub batcher: BatcherConfig,
    pub log: LogConfig,
}

fn parse_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

fn load_scheduler() -> SchedulerKind {
    let kind = std::env::var("TICKBATCH_SCHEDULER")
        .ok()
        .and_then(|v| v.parse::<SchedulerKind>().ok())
        .unwrap_or_default();
    match kind {
        SchedulerKind::Timer { delay_ms } => {
            let delay_ms = parse_u64("TICKBATCH_TIMER_DELAY_MS", delay_ms);
            SchedulerKind::Timer { delay_ms: delay_ms.clamp(1, MAX_TIMER_DELAY_MS) }
        }
        other => other,
    }
}

fn load_log_config() -> LogConfig {
    let defaults = LogConfig::default();
    let level = std::env::var("TICKBATCH_LOG_LEVEL")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(defaults.level);
    let format = std::env::var("TICKBATCH_LOG_FORMAT")
        .ok()
        .and_then(|v| v.parse::<LogFormat>().ok())
        .unwrap_or(defaults.format);
    let batch_level = std::env::var("TICKBATCH_BATCH_LOG_LEVEL")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    LogConfig { format, level, batch_level, output_path: None }
}

/// Serializes tests that mutate `TICKBATCH_*` variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Load all configuration from environment variables.
///
/// Missing or invalid values fall back to safe defaults without panicking.
pub fn load() -> EnvConfig {
    let name = std::env::var("TICKBATCH_NAME")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| BatcherConfig::default().name);

    EnvConfig {
        batcher: BatcherConfig { name, scheduler: load_scheduler() },
        log: load_log_config(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_KEYS: &[&str] = &[
        "TICKBATCH_SCHEDULER",
        "TICKBATCH_TIMER_DELAY_MS",
        "TICKBATCH_NAME",
        "TICKBATCH_LOG_LEVEL",
        "TICKBATCH_BATCH_LOG_LEVEL",
        "TICKBATCH_LOG_FORMAT",
    ];

    fn clear_env_vars() {
        for k in ENV_KEYS {
            std::env::remove_var(k);
        }
    }

    #[test]
    fn test_defaults_are_sensible() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        let cfg = load();
        assert_eq!(cfg.batcher, BatcherConfig::default());
        assert_eq!(cfg.log.level, "info");
        assert_eq!(cfg.log.format, LogFormat::Json);
        assert_eq!(cfg.log.batch_level, None);
    }

    #[test]
    fn test_env_vars_override_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("TICKBATCH_SCHEDULER", "timer");
        std::env::set_var("TICKBATCH_TIMER_DELAY_MS", "25");
        std::env::set_var("TICKBATCH_NAME", "score-updates");
        std::env::set_var("TICKBATCH_LOG_FORMAT", "pretty");
        std::env::set_var("TICKBATCH_BATCH_LOG_LEVEL", " debug ");
        let cfg = load();
        assert_eq!(cfg.batcher.scheduler, SchedulerKind::Timer { delay_ms: 25 });
        assert_eq!(cfg.batcher.name, "score-updates");
        assert_eq!(cfg.log.format, LogFormat::Pretty);
        assert_eq!(cfg.log.filter_directive(), "info,tickbatch=debug");
        clear_env_vars();
    }

    #[test]
    fn test_invalid_env_falls_back_to_default() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("TICKBATCH_SCHEDULER", "setTimeout");
        std::env::set_var("TICKBATCH_LOG_FORMAT", "xml");
        std::env::set_var("TICKBATCH_NAME", "  ");
        let cfg = load();
        assert_eq!(cfg.batcher.scheduler, SchedulerKind::Auto);
        assert_eq!(cfg.log.format, LogFormat::Json);
        assert_eq!(cfg.batcher.name, "batcher");
        clear_env_vars();
    }

    #[test]
    fn test_timer_delay_is_clamped() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("TICKBATCH_SCHEDULER", "timer");
        std::env::set_var("TICKBATCH_TIMER_DELAY_MS", "0");
        assert_eq!(load().batcher.scheduler, SchedulerKind::Timer { delay_ms: 1 });

        std::env::set_var("TICKBATCH_TIMER_DELAY_MS", "999999999");
        assert_eq!(
            load().batcher.scheduler,
            SchedulerKind::Timer { delay_ms: MAX_TIMER_DELAY_MS }
        );
        clear_env_vars();
    }

    #[test]
    fn test_delay_ignored_for_other_schedulers() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("TICKBATCH_SCHEDULER", "next-tick");
        std::env::set_var("TICKBATCH_TIMER_DELAY_MS", "50");
        assert_eq!(load().batcher.scheduler, SchedulerKind::NextTick);
        clear_env_vars();
    }

    #[test]
    fn test_toml_config() {
        let cfg = BatcherConfig::from_toml_str(
            r#"
            name = "score-updates"

            [scheduler]
            kind = "timer"
            delay_ms = 5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.name, "score-updates");
        assert_eq!(cfg.scheduler, SchedulerKind::Timer { delay_ms: 5 });
    }

    #[test]
    fn test_toml_defaults_and_errors() {
        let cfg = BatcherConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, BatcherConfig::default());

        let cfg = BatcherConfig::from_toml_str("[scheduler]\nkind = \"next-tick\"\n").unwrap();
        assert_eq!(cfg.scheduler, SchedulerKind::NextTick);

        let err = BatcherConfig::from_toml_str("[scheduler]\nkind = \"fiber\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
