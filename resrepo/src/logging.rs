//! Tracing subscriber setup.
//!
//! # Filter priority (highest to lowest)
//!
//! 1. `RESREPO_LOG` env var (per-target directives, e.g. `resrepo=debug,warn`)
//! 2. `RUST_LOG` env var
//! 3. The configured level (`[logging] level`)
//! 4. The verbosity default
//!
//! Logs go to stderr. When a directory is configured, a daily rolling file
//! is written as well; keep the returned guard alive until exit so buffered
//! lines are flushed.

use std::path::PathBuf;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::error::RepositoryError;

/// Environment variable checked before `RUST_LOG`.
pub const LOG_ENV_VAR: &str = "RESREPO_LOG";

/// File name prefix of rolling log files.
pub const LOG_FILE_PREFIX: &str = "resrepo.log";

/// Verbosity derived from CLI flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub const fn from_flags(verbose: bool, quiet: bool) -> Self {
        if verbose {
            Self::Verbose
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    pub const fn default_level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
        }
    }
}

/// What to set up.
#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    pub verbosity: Verbosity,
    /// Level or directive from configuration; overrides the verbosity
    /// default unless the flags asked for something else.
    pub level: Option<String>,
    /// Directory for daily log files.
    pub directory: Option<PathBuf>,
}

/// Install the global subscriber.
///
/// Returns the file writer's guard when file logging is enabled. Fails if a
/// subscriber is already installed or the log directory cannot be created.
pub fn init_logging(options: LoggingOptions) -> Result<Option<WorkerGuard>, RepositoryError> {
    let filter = build_env_filter(&options);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    let (file_layer, guard) = match &options.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| RepositoryError::Config(format!("logging already initialised: {}", e)))?;

    Ok(guard)
}

fn build_env_filter(options: &LoggingOptions) -> EnvFilter {
    if let Ok(directives) = std::env::var(LOG_ENV_VAR) {
        if let Ok(filter) = EnvFilter::try_new(&directives) {
            return filter;
        }
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let directive = default_directive(options);
    EnvFilter::try_new(&directive)
        .unwrap_or_else(|_| EnvFilter::new(options.verbosity.default_level().as_str()))
}

/// Directive used when no environment filter is set.
fn default_directive(options: &LoggingOptions) -> String {
    match (options.verbosity, &options.level) {
        (Verbosity::Normal, Some(level)) => level.clone(),
        (Verbosity::Verbose, _) => format!("{},resrepo=debug", Level::INFO),
        (verbosity, _) => verbosity.default_level().to_string(),
    }
}
