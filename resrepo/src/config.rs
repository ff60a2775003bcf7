//! Repository configuration.
//!
//! Built in code with `with_*` builders, or read from an INI file:
//!
//! ```ini
//! [repository]
//! cache_dir = ~/.cache/resrepo
//! persistent_cache = true
//! code_version = 1.4.2
//! staleness_threshold = 0.05
//! parallel_initial_scan = true
//! ignore_hidden = true
//!
//! [logging]
//! level = debug
//! directory = ~/.resrepo/logs
//! ```
//!
//! Missing keys keep their defaults. Unknown keys are ignored.

use ini::Ini;
use std::path::{Path, PathBuf};

use crate::cache::{cache_file_path, default_cache_dir, CACHE_STALENESS_THRESHOLD};
use crate::error::RepositoryError;

/// Default code version written into cache headers.
pub const DEFAULT_CODE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default fraction of cache misses that triggers a rewrite.
pub const DEFAULT_STALENESS_THRESHOLD: f64 = CACHE_STALENESS_THRESHOLD;

/// Parse files of the initial scan on the rayon pool by default.
pub const DEFAULT_PARALLEL_INITIAL_SCAN: bool = true;

/// Skip dot-directories under the resource root by default.
pub const DEFAULT_IGNORE_HIDDEN: bool = true;

/// Read and write the persistent cache by default.
pub const DEFAULT_PERSISTENT_CACHE: bool = true;

/// Default log level when no environment filter is set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Logging section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Level or filter directive, e.g. `debug` or `resrepo=trace,warn`.
    pub level: String,
    /// Directory for daily log files; stderr only when unset.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            directory: None,
        }
    }
}

/// Settings shared by both repository kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryConfig {
    /// Where cache files live. Falls back to the platform cache directory.
    pub cache_dir: Option<PathBuf>,

    /// Whether the incremental repository reads and writes a cache file.
    pub persistent_cache: bool,

    /// Token stored in cache headers. Caches written under another token are
    /// discarded.
    pub code_version: String,

    /// Fraction of parsable files that may miss the cache before it is
    /// rewritten.
    pub staleness_threshold: f64,

    /// Parse initial-scan files in parallel.
    pub parallel_initial_scan: bool,

    /// Skip directories starting with `.`.
    pub ignore_hidden: bool,

    pub logging: LoggingConfig,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            persistent_cache: DEFAULT_PERSISTENT_CACHE,
            code_version: DEFAULT_CODE_VERSION.to_string(),
            staleness_threshold: DEFAULT_STALENESS_THRESHOLD,
            parallel_initial_scan: DEFAULT_PARALLEL_INITIAL_SCAN,
            ignore_hidden: DEFAULT_IGNORE_HIDDEN,
            logging: LoggingConfig::default(),
        }
    }
}

impl RepositoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Enable or disable the persistent cache.
    pub fn with_persistent_cache(mut self, enabled: bool) -> Self {
        self.persistent_cache = enabled;
        self
    }

    /// Set the cache code version.
    pub fn with_code_version(mut self, version: impl Into<String>) -> Self {
        self.code_version = version.into();
        self
    }

    /// Set the staleness threshold, clamped to `0.0..=1.0`.
    pub fn with_staleness_threshold(mut self, threshold: f64) -> Self {
        self.staleness_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Enable or disable parallel parsing of the initial scan.
    pub fn with_parallel_initial_scan(mut self, parallel: bool) -> Self {
        self.parallel_initial_scan = parallel;
        self
    }

    /// Enable or disable skipping hidden directories.
    pub fn with_ignore_hidden(mut self, ignore: bool) -> Self {
        self.ignore_hidden = ignore;
        self
    }

    /// Cache file for `root`, or `None` when caching is off or no cache
    /// directory can be determined.
    pub fn cache_file_for(&self, root: &Path) -> Option<PathBuf> {
        if !self.persistent_cache {
            return None;
        }
        let dir = self.cache_dir.clone().or_else(default_cache_dir)?;
        Some(cache_file_path(&dir, root))
    }

    /// Read an INI file.
    pub fn load(path: &Path) -> Result<Self, RepositoryError> {
        let ini = Ini::load_from_file(path).map_err(|e| {
            RepositoryError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_ini(&ini)
    }

    /// Parse INI text.
    pub fn from_ini_str(text: &str) -> Result<Self, RepositoryError> {
        let ini = Ini::load_from_str(text)
            .map_err(|e| RepositoryError::Config(format!("invalid configuration: {}", e)))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, RepositoryError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("repository")) {
            if let Some(dir) = section.get("cache_dir") {
                config.cache_dir = Some(expand_tilde(dir));
            }
            if let Some(value) = section.get("persistent_cache") {
                config.persistent_cache = parse_bool("persistent_cache", value)?;
            }
            if let Some(value) = section.get("code_version") {
                config.code_version = value.to_string();
            }
            if let Some(value) = section.get("staleness_threshold") {
                let threshold: f64 = value.trim().parse().map_err(|_| {
                    RepositoryError::Config(format!("staleness_threshold: not a number: {}", value))
                })?;
                if !(0.0..=1.0).contains(&threshold) {
                    return Err(RepositoryError::Config(format!(
                        "staleness_threshold must be between 0 and 1, got {}",
                        threshold
                    )));
                }
                config.staleness_threshold = threshold;
            }
            if let Some(value) = section.get("parallel_initial_scan") {
                config.parallel_initial_scan = parse_bool("parallel_initial_scan", value)?;
            }
            if let Some(value) = section.get("ignore_hidden") {
                config.ignore_hidden = parse_bool("ignore_hidden", value)?;
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(level) = section.get("level") {
                config.logging.level = level.trim().to_string();
            }
            if let Some(dir) = section.get("directory") {
                config.logging.directory = Some(expand_tilde(dir));
            }
        }

        Ok(config)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, RepositoryError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(RepositoryError::Config(format!(
            "{}: expected a boolean, got {}",
            key, other
        ))),
    }
}

fn expand_tilde(value: &str) -> PathBuf {
    let value = value.trim();
    match value.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(value)),
        None => PathBuf::from(value),
    }
}
