//! Memoized folder-name parsing.
//!
//! Every file event carries a path whose parent directory name has to be
//! turned into a folder type and configuration. The same few dozen folder
//! names come up over and over, so parsed results (including rejections)
//! are kept in a concurrent map owned by the repository.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::folder::FolderConfiguration;
use crate::resource::ResourceFolderType;

/// A parsed folder name.
pub type FolderInfo = (ResourceFolderType, Arc<FolderConfiguration>);

/// Concurrent cache of folder name -> parsed configuration.
#[derive(Debug, Default)]
pub struct FolderConfigCache {
    entries: DashMap<String, Option<FolderInfo>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl FolderConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `folder_name`, reusing an earlier result when available.
    ///
    /// Returns `None` for names that are not valid resource folders.
    pub fn get(&self, folder_name: &str) -> Option<FolderInfo> {
        if let Some(entry) = self.entries.get(folder_name) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return entry.value().clone();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let parsed = match FolderConfiguration::from_folder_name(folder_name) {
            Ok((folder_type, config)) => Some((folder_type, Arc::new(config))),
            Err(e) => {
                tracing::debug!(folder = folder_name, error = %e, "Ignoring folder");
                None
            }
        };
        self.entries
            .entry(folder_name.to_string())
            .or_insert(parsed)
            .value()
            .clone()
    }

    /// Shared configuration for a qualifier string, e.g. from the persistent
    /// cache. The key is the folder name under `folder_type`.
    pub fn get_for(&self, folder_type: ResourceFolderType, qualifiers: &str) -> Option<Arc<FolderConfiguration>> {
        let name = if qualifiers.is_empty() {
            folder_type.name().to_string()
        } else {
            format!("{}-{}", folder_type.name(), qualifiers)
        };
        self.get(&name).map(|(_, config)| config)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_once() {
        let cache = FolderConfigCache::new();
        let first = cache.get("values-fr").unwrap();
        let second = cache.get("values-fr").unwrap();
        assert!(Arc::ptr_eq(&first.1, &second.1));
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_caches_rejections() {
        let cache = FolderConfigCache::new();
        assert!(cache.get("values-bogus").is_none());
        assert!(cache.get("values-bogus").is_none());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_get_for_qualifier_string() {
        let cache = FolderConfigCache::new();
        let config = cache.get_for(ResourceFolderType::Values, "fr-rCA").unwrap();
        assert_eq!(config.region(), Some("CA"));
        let default = cache.get_for(ResourceFolderType::Layout, "").unwrap();
        assert!(default.is_default());
    }
}
