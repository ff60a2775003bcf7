//! Persistent cache for fast repository startup.
//!
//! Parsing every values and layout file of a large resource tree is the
//! dominant cost of opening a repository. The parsed [`SourceKind`] of each
//! markup file is therefore written to one cache file per resource root and
//! reused on the next start for every file whose stamp still matches.
//!
//! # Validation
//!
//! - The header (magic, format version, root, code version) must match
//!   exactly, or the whole cache is discarded.
//! - Each record carries the combined hash of the file's modification time
//!   and length; a mismatch makes that one file a cache miss.
//! - When misses exceed [`CACHE_STALENESS_THRESHOLD`] of the parsable files,
//!   the cache is rewritten after loading finishes.
//!
//! # Example
//!
//! ```ignore
//! use resrepo::cache::{CacheHeader, ResourceCache};
//!
//! let header = CacheHeader::new(&root, "1.0");
//! match ResourceCache::load(&cache_path, &header, &configs) {
//!     Ok(cache) => println!("{} cached files", cache.len()),
//!     Err(e) => println!("starting cold: {}", e),
//! }
//! ```

pub mod codec;

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::configuration::{FolderConfigCache, FolderConfiguration};
use crate::error::CacheError;
use crate::repository::table::TableState;
use crate::resource::ResourceFolderType;
use crate::source::{FileStamp, SourceKind};

pub use codec::{CacheBody, CacheHeader, CachedSource, CACHE_FORMAT_VERSION, CACHE_MAGIC};

/// Fraction of parsable files that may miss the cache before it is
/// rewritten.
pub const CACHE_STALENESS_THRESHOLD: f64 = 0.05;

/// A cached source, resolved against the live root.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub folder_type: ResourceFolderType,
    pub configuration: Arc<FolderConfiguration>,
    pub stamp_hash: u64,
    pub kind: SourceKind,
}

/// A loaded cache file, keyed by absolute path.
#[derive(Debug, Clone)]
pub struct ResourceCache {
    header: CacheHeader,
    entries: HashMap<PathBuf, CacheEntry>,
}

impl ResourceCache {
    /// Load and validate a cache file.
    ///
    /// Records naming a folder that no longer parses are dropped.
    pub fn load(
        path: &Path,
        expected: &CacheHeader,
        configs: &FolderConfigCache,
    ) -> Result<Self, CacheError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let body = codec::read_cache(&mut reader, expected)?;
        Ok(Self::from_body(expected.clone(), body, configs))
    }

    fn from_body(header: CacheHeader, body: CacheBody, configs: &FolderConfigCache) -> Self {
        let mut entries = HashMap::with_capacity(body.sources.len());
        for source in body.sources {
            let qualifiers = &body.configurations[source.config_index as usize];
            let Some(configuration) = configs.get_for(source.folder_type, qualifiers) else {
                continue;
            };
            entries.insert(
                header.root.join(&source.rel_path),
                CacheEntry {
                    folder_type: source.folder_type,
                    configuration,
                    stamp_hash: source.stamp_hash,
                    kind: source.kind,
                },
            );
        }
        Self { header, entries }
    }

    pub fn header(&self) -> &CacheHeader {
        &self.header
    }

    /// The cached entry for `path` if it was written for the same stamp.
    pub fn lookup(&self, path: &Path, stamp: &FileStamp) -> Option<&CacheEntry> {
        self.entries
            .get(path)
            .filter(|entry| entry.stamp_hash == stamp.hash())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache hits and misses over the parsable files of one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheLoadStats {
    pub parsable_files: usize,
    pub hits: usize,
    pub misses: usize,
}

impl CacheLoadStats {
    pub fn miss_ratio(&self) -> f64 {
        if self.parsable_files == 0 {
            0.0
        } else {
            self.misses as f64 / self.parsable_files as f64
        }
    }

    /// Whether misses exceed `threshold` of the parsable files.
    pub fn is_stale(&self, threshold: f64) -> bool {
        self.misses as f64 > threshold * self.parsable_files as f64
    }
}

/// Capture the cacheable sources of a table, relative to `root`.
///
/// Sources edited in place or parsed with errors are left out, so the next
/// load parses them from disk again.
pub(crate) fn snapshot(state: &TableState, root: &Path) -> CacheBody {
    let mut config_indices: BTreeMap<String, u32> = BTreeMap::new();
    let mut body = CacheBody::default();

    let mut sources: Vec<_> = state
        .sources
        .values()
        .filter(|s| s.is_cacheable())
        .collect();
    sources.sort_by(|a, b| a.path().cmp(b.path()));

    for source in sources {
        let (Ok(rel_path), Some(stamp)) = (source.path().strip_prefix(root), source.stamp()) else {
            continue;
        };
        let qualifiers = source.configuration_arc().qualifier_string();
        let next = body.configurations.len() as u32;
        let config_index = *config_indices.entry(qualifiers.clone()).or_insert_with(|| {
            body.configurations.push(qualifiers);
            next
        });
        body.sources.push(CachedSource {
            rel_path: rel_path.to_path_buf(),
            folder_type: source.folder_type(),
            config_index,
            stamp_hash: stamp.hash(),
            kind: source.kind().clone(),
        });
    }
    body
}

/// Write a cache file atomically (temp file, then rename).
pub fn write_cache_file(path: &Path, header: &CacheHeader, body: &CacheBody) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("tmp");
    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        codec::write_cache(&mut writer, header, body)?;
    }
    fs::rename(&temp_path, path)?;
    tracing::debug!(
        path = %path.display(),
        sources = body.sources.len(),
        "Wrote resource cache"
    );
    Ok(())
}

/// Directory for cache files when none is configured.
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("resrepo"))
}

/// Cache file for `root` inside `cache_dir`, named by a hash of the root.
pub fn cache_file_path(cache_dir: &Path, root: &Path) -> PathBuf {
    let digest = Sha256::digest(root.to_string_lossy().as_bytes());
    let name: String = digest[..8].iter().map(|b| format!("{:02x}", b)).collect();
    cache_dir.join(format!("{}.cache", name))
}
