//! # Logger
//!
//! Installs the process-wide `tracing` subscriber for the connector, its buffering layers and
//! the demo binary, driven by the `logging` section of the Stratum configuration.
//!
//! Events always go to the console. A `directory` adds a daily rolling file sink named after the
//! logger, `json` switches every sink to JSON lines, and `env_filter` replaces both `level` and
//! `RUST_LOG`.
//!
//! ## Example
//!
//! ```rust
//! # use stratum_domain::config::LoggingConfig;
//! # use stratum_logger::Logger;
//! let config = LoggingConfig { level: "debug".to_owned(), ..LoggingConfig::default() };
//! let _logger = Logger::from_config("stratum-demo", &config).unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;

use std::fs;
use std::path::{Path, PathBuf};
use stratum_domain::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Rolled files kept per logger.
const RETAINED_FILES: usize = 10;

type Sink = Box<dyn Layer<Registry> + Send + Sync>;

/// A validated [`LoggingConfig`], checked before anything global is touched.
#[derive(Debug)]
struct SinkPlan {
    prefix: String,
    directive: Directive,
    json: bool,
    directory: Option<PathBuf>,
}

#[derive(Debug, PartialEq, Eq)]
enum Directive {
    /// Default level; `RUST_LOG` may still refine it.
    Level(LevelFilter),
    /// An explicit filter that ignores `RUST_LOG`.
    Filter(String),
}

impl SinkPlan {
    fn new(name: &str, config: &LoggingConfig) -> Result<Self, LoggerError> {
        let prefix = name.trim();
        if prefix.is_empty() || prefix.contains(['/', '\\']) {
            return Err(LoggerError::InvalidConfiguration {
                message: format!("'{name}' cannot name log files").into(),
                context: None,
            });
        }

        let directive = match config.env_filter.as_deref().map(str::trim) {
            Some(filter) if !filter.is_empty() => {
                // Parsed once here so a typo fails before the subscriber is installed.
                filter_from(filter)?;
                Directive::Filter(filter.to_owned())
            }
            _ => Directive::Level(parse_level(&config.level)?),
        };

        Ok(Self {
            prefix: prefix.to_owned(),
            directive,
            json: config.json,
            directory: config.directory.clone(),
        })
    }

    fn filter(&self) -> Result<EnvFilter, LoggerError> {
        match &self.directive {
            Directive::Level(level) => Ok(EnvFilter::builder()
                .with_default_directive((*level).into())
                .from_env_lossy()),
            Directive::Filter(filter) => filter_from(filter),
        }
    }

    fn console(&self) -> Sink {
        let console = fmt::layer().with_target(true);
        if self.json { console.json().boxed() } else { console.compact().boxed() }
    }

    fn file(&self, directory: &Path) -> Result<(Sink, WorkerGuard), LoggerError> {
        fs::create_dir_all(directory)
            .context(format!("Creating log directory {}", directory.display()))?;
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(&self.prefix)
            .filename_suffix("log")
            .max_log_files(RETAINED_FILES)
            .build(directory)?;

        let (writer, guard) = tracing_appender::non_blocking(appender);
        let file = fmt::layer().with_writer(writer).with_ansi(false);
        let sink = if self.json { file.json().boxed() } else { file.boxed() };
        Ok((sink, guard))
    }
}

fn filter_from(directive: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::builder().parse(directive).map_err(|e| LoggerError::InvalidConfiguration {
        message: format!("env filter '{directive}': {e}").into(),
        context: None,
    })
}

/// The installed subscriber. Dropping it flushes the file sink and stops its worker thread.
#[must_use = "Dropping this handle stops the file sink worker."]
#[derive(Debug)]
pub struct Logger {
    file_guard: Option<WorkerGuard>,
}

impl Logger {
    /// Installs the subscriber described by `config`; `name` prefixes rolling log files.
    ///
    /// # Errors
    /// * [`LoggerError::InvalidConfiguration`] for an unusable name, level or filter. Nothing is
    ///   installed in that case.
    /// * [`LoggerError::Directory`] or [`LoggerError::Appender`] when the file sink cannot be set
    ///   up.
    /// * [`LoggerError::Subscriber`] if the process already has a global subscriber.
    pub fn from_config(name: &str, config: &LoggingConfig) -> Result<Self, LoggerError> {
        let plan = SinkPlan::new(name, config)?;
        let filter = plan.filter()?;

        let mut sinks = vec![plan.console()];
        let file_guard = match plan.directory.as_deref() {
            Some(directory) => {
                let (sink, guard) = plan.file(directory)?;
                sinks.push(sink);
                Some(guard)
            }
            None => None,
        };

        tracing_subscriber::registry().with(sinks).with(filter).try_init()?;
        tracing::debug!(
            logger = %plan.prefix,
            directory = ?plan.directory,
            json = plan.json,
            "Logging installed"
        );
        Ok(Self { file_guard })
    }

    /// `true` when events are also written to rolling files.
    #[must_use]
    pub const fn has_file_sink(&self) -> bool {
        self.file_guard.is_some()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.file_guard.is_some() {
            tracing::debug!("Flushing file sink");
        }
    }
}

/// Parses a level name (`"trace"` .. `"error"`, `"off"`), case-insensitively.
///
/// # Errors
/// [`LoggerError::InvalidConfiguration`] for anything else.
pub fn parse_level(level: &str) -> Result<LevelFilter, LoggerError> {
    level.trim().parse::<LevelFilter>().map_err(|e| LoggerError::InvalidConfiguration {
        message: format!("log level '{level}': {e}").into(),
        context: None,
    })
}
