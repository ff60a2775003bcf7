//! Binary layout of the persistent cache.
//!
//! ```text
//! ┌──────────────────┬──────────────────────────────┬─────────────────────────────┐
//! │ "Resource cache" │ CacheHeader (bincode)        │ CacheBody (bincode)         │
//! │ 14 raw bytes     │ format version, root, code   │ configurations, sources     │
//! └──────────────────┴──────────────────────────────┴─────────────────────────────┘
//! ```
//!
//! The header is checked field by field before the body is touched; any
//! mismatch rejects the whole file.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::CacheError;
use crate::resource::ResourceFolderType;
use crate::source::SourceKind;

/// Leading bytes of every cache file.
pub const CACHE_MAGIC: &[u8; 14] = b"Resource cache";

/// Bumped whenever the body layout changes.
pub const CACHE_FORMAT_VERSION: &str = "2";

/// Identity of a cache file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheHeader {
    pub format_version: String,
    pub root: PathBuf,
    /// Caller-supplied token; a new value invalidates older caches.
    pub code_version: String,
}

impl CacheHeader {
    pub fn new(root: &Path, code_version: &str) -> Self {
        Self {
            format_version: CACHE_FORMAT_VERSION.to_string(),
            root: root.to_path_buf(),
            code_version: code_version.to_string(),
        }
    }

    /// Describe the first field that differs from `expected`.
    fn mismatch(&self, expected: &CacheHeader) -> Option<String> {
        if self.format_version != expected.format_version {
            return Some(format!(
                "format version {} (expected {})",
                self.format_version, expected.format_version
            ));
        }
        if self.root != expected.root {
            return Some(format!(
                "root {} (expected {})",
                self.root.display(),
                expected.root.display()
            ));
        }
        if self.code_version != expected.code_version {
            return Some(format!(
                "code version {} (expected {})",
                self.code_version, expected.code_version
            ));
        }
        None
    }
}

/// One cached source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSource {
    /// Path relative to the resource root.
    pub rel_path: PathBuf,
    pub folder_type: ResourceFolderType,
    /// Index into [`CacheBody::configurations`].
    pub config_index: u32,
    /// [`FileStamp::hash`](crate::source::FileStamp::hash) at parse time.
    pub stamp_hash: u64,
    pub kind: SourceKind,
}

/// Everything after the header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheBody {
    /// Qualifier strings, shared by index.
    pub configurations: Vec<String>,
    pub sources: Vec<CachedSource>,
}

/// Write magic, header and body.
pub fn write_cache<W: Write>(
    writer: &mut W,
    header: &CacheHeader,
    body: &CacheBody,
) -> Result<(), CacheError> {
    writer.write_all(CACHE_MAGIC)?;
    bincode::serialize_into(&mut *writer, header).map_err(|e| CacheError::Encode(e.to_string()))?;
    bincode::serialize_into(&mut *writer, body).map_err(|e| CacheError::Encode(e.to_string()))?;
    writer.flush()?;
    Ok(())
}

/// Read and check magic and header, leaving `reader` at the body.
pub fn read_header<R: Read>(reader: &mut R, expected: &CacheHeader) -> Result<CacheHeader, CacheError> {
    let mut magic = [0u8; 14];
    reader.read_exact(&mut magic)?;
    if &magic != CACHE_MAGIC {
        return Err(CacheError::HeaderMismatch("bad magic".to_string()));
    }
    let header: CacheHeader =
        bincode::deserialize_from(&mut *reader).map_err(|e| CacheError::Decode(e.to_string()))?;
    if let Some(reason) = header.mismatch(expected) {
        return Err(CacheError::HeaderMismatch(reason));
    }
    Ok(header)
}

/// Read a whole cache stream, rejecting it on any header mismatch.
pub fn read_cache<R: Read>(reader: &mut R, expected: &CacheHeader) -> Result<CacheBody, CacheError> {
    read_header(reader, expected)?;
    let body: CacheBody =
        bincode::deserialize_from(&mut *reader).map_err(|e| CacheError::Decode(e.to_string()))?;
    for source in &body.sources {
        if source.config_index as usize >= body.configurations.len() {
            return Err(CacheError::Decode(format!(
                "configuration index {} out of range",
                source.config_index
            )));
        }
    }
    Ok(body)
}
