//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use resrepo::{FolderConfiguration, RepositoryConfig};
use tempfile::TempDir;

/// A temporary resource root plus a separate cache directory.
pub struct ResTree {
    root: TempDir,
    cache: TempDir,
}

impl ResTree {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
            cache: TempDir::new().unwrap(),
        }
    }

    /// Canonical path of the resource root.
    pub fn root(&self) -> PathBuf {
        fs::canonicalize(self.root.path()).unwrap()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn write_strings(&self, rel: &str, entries: &[(&str, &str)]) -> PathBuf {
        self.write(rel, &strings_xml(entries))
    }

    pub fn remove(&self, rel: &str) -> PathBuf {
        let path = self.path(rel);
        if path.is_dir() {
            fs::remove_dir_all(&path).unwrap();
        } else {
            fs::remove_file(&path).unwrap();
        }
        path
    }

    pub fn cache_dir(&self) -> &Path {
        self.cache.path()
    }

    /// Config with the persistent cache in this tree's cache directory.
    pub fn cached_config(&self) -> RepositoryConfig {
        RepositoryConfig::default().with_cache_dir(self.cache.path())
    }

    /// Config with the persistent cache turned off.
    pub fn uncached_config(&self) -> RepositoryConfig {
        RepositoryConfig::default().with_persistent_cache(false)
    }
}

/// A values file declaring one string per entry.
pub fn strings_xml(entries: &[(&str, &str)]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<resources>\n");
    for (name, value) in entries {
        xml.push_str(&format!("    <string name=\"{}\">{}</string>\n", name, value));
    }
    xml.push_str("</resources>\n");
    xml
}

pub fn config(qualifiers: &str) -> FolderConfiguration {
    FolderConfiguration::from_qualifier_string(qualifiers).unwrap()
}

/// The app-name layout used across tests: a default and a French
/// translation.
pub fn app_name_tree() -> ResTree {
    let tree = ResTree::new();
    tree.write_strings("values/strings.xml", &[("app_name", "MyApp"), ("title", "Title")]);
    tree.write_strings("values-fr/strings.xml", &[("app_name", "MonApp")]);
    tree
}
