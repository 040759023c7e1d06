//! Subscriber setup for processes hosting batchers.
//!
//! The filter is built from a base directive plus an optional override for
//! the `tickbatch` target, so flush traces can be raised without turning up
//! the host's own logging.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{self, EnvConfig};
use crate::error::ConfigError;

/// Target prefix of every batcher event and `batch_dispatch` span.
pub const BATCH_TARGET: &str = "tickbatch";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, span fields included.
    #[default]
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(ConfigError::UnknownLogFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Base filter directive for every target.
    pub level: String,
    /// Level for [`BATCH_TARGET`] only, e.g. `trace` to see arming and
    /// deferred settles.
    pub batch_level: Option<String>,
    /// Append to this file instead of writing to stderr.
    pub output_path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            level: "info".to_string(),
            batch_level: None,
            output_path: None,
        }
    }
}

impl LogConfig {
    /// Directive handed to [`EnvFilter`].
    pub fn filter_directive(&self) -> String {
        match &self.batch_level {
            Some(batch) => format!("{},{BATCH_TARGET}={batch}", self.level),
            None => self.level.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("invalid log filter `{directive}`: {reason}")]
    InvalidFilter { directive: String, reason: String },
    #[error("failed to open log file {}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("a global subscriber is already installed")]
    AlreadyInitialized,
}

fn make_writer(path: Option<&Path>) -> Result<BoxMakeWriter, LogError> {
    match path {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LogError::FileOpen { path: path.to_path_buf(), source })?;
            Ok(BoxMakeWriter::new(Mutex::new(file)))
        }
        None => Ok(BoxMakeWriter::new(std::io::stderr)),
    }
}

/// Install the global tracing subscriber. Call once at startup.
pub fn init_logging(config: &LogConfig) -> Result<(), LogError> {
    let directive = config.filter_directive();
    let filter = EnvFilter::try_new(&directive).map_err(|e| LogError::InvalidFilter {
        directive: directive.clone(),
        reason: e.to_string(),
    })?;
    let writer = make_writer(config.output_path.as_deref())?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_writer(writer))
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty().with_writer(writer)).try_init(),
    };
    installed.map_err(|_| LogError::AlreadyInitialized)
}

/// Load `TICKBATCH_*` settings, install logging from them and return the
/// configuration so the host can build its batchers with
/// [`Batcher::from_config`](crate::Batcher::from_config).
pub fn init_from_env() -> Result<EnvConfig, LogError> {
    let config = config::load();
    init_logging(&config.log)?;
    tracing::debug!(
        target: BATCH_TARGET,
        batcher = %config.batcher.name,
        scheduler = ?config.batcher.scheduler,
        "logging initialized"
    );
    Ok(config)
}
