//! Error types for the resource repository.
//!
//! None of these errors take the repository down. Parse failures become
//! [`ScanError`](crate::source::ScanError) records on the scanning context,
//! cache failures fall back to a live scan, and a vanished file is treated as
//! a deletion. The enums below surface at the API edges: opening a
//! repository, reading configuration, and reading or writing the cache.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by repository construction and maintenance.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The resource root does not exist or is not a directory.
    #[error("Resource root is not a directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    /// The persistent cache could not be written.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// The file watcher could not be started.
    #[error("Watch error: {0}")]
    Watch(String),

    /// Configuration was invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No tokio runtime is available to drive the update worker.
    #[error("No tokio runtime available; incremental repositories must be opened inside a runtime")]
    NoRuntime,

    /// The blocking task that performs the initial load panicked or was
    /// cancelled.
    #[error("Initial load task failed: {0}")]
    LoadTask(String),
}

/// Errors raised by the persistent cache codec.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the cache file failed.
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The header did not match the expected magic, format version, root or
    /// code version.
    #[error("Cache header mismatch: {0}")]
    HeaderMismatch(String),

    /// The body could not be decoded.
    #[error("Failed to decode cache: {0}")]
    Decode(String),

    /// The body could not be encoded.
    #[error("Failed to encode cache: {0}")]
    Encode(String),
}

/// Why a folder name was rejected as a configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QualifierError {
    /// The base name is not a known resource folder type.
    #[error("Unknown resource folder type: {0}")]
    UnknownFolderType(String),

    /// A qualifier token was empty (e.g. `values--fr`).
    #[error("Empty qualifier in folder name")]
    EmptyQualifier,

    /// A token was not recognised as any qualifier.
    #[error("Unknown qualifier: {0}")]
    UnknownQualifier(String),

    /// A token was recognised but appears after a qualifier of lower precedence.
    #[error("Qualifier '{0}' is out of order")]
    OutOfOrder(String),

    /// A locale region token appeared without a language.
    #[error("Region '{0}' without a language")]
    DanglingRegion(String),
}

/// A markup document could not be parsed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct MarkupError {
    /// 1-based line of the failure, or 0 when unknown.
    pub line: usize,
    pub message: String,
}

impl MarkupError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}
