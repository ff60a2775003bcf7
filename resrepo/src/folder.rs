//! Resource folders and per-file change processing.
//!
//! A [`ResourceFolder`] is one directory under the resource root
//! (`values-fr`, `drawable-hdpi`, ...). It knows its folder type and
//! configuration and maps file names to the sources created for them.
//! Sources are created lazily: the first time a file is seen, either during
//! a scan or through [`TableState::get_file`].

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::configuration::{FolderConfigCache, FolderConfiguration};
use crate::markup::MarkupParser;
use crate::repository::table::{CommitResult, TableState};
use crate::resource::ResourceFolderType;
use crate::source::{parse_source, ScanContext, ScanError, SourceId};

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeltaKind {
    Added,
    Changed,
    Removed,
}

/// One directory of resources.
#[derive(Debug, Clone)]
pub struct ResourceFolder {
    folder_type: ResourceFolderType,
    configuration: Arc<FolderConfiguration>,
    dir: PathBuf,
    files: BTreeMap<String, SourceId>,
}

impl ResourceFolder {
    pub fn new(
        folder_type: ResourceFolderType,
        configuration: Arc<FolderConfiguration>,
        dir: PathBuf,
    ) -> Self {
        Self {
            folder_type,
            configuration,
            dir,
            files: BTreeMap::new(),
        }
    }

    pub fn folder_type(&self) -> ResourceFolderType {
        self.folder_type
    }

    pub fn configuration(&self) -> &FolderConfiguration {
        &self.configuration
    }

    pub fn configuration_arc(&self) -> &Arc<FolderConfiguration> {
        &self.configuration
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Source of an already-known file.
    pub fn file(&self, name: &str) -> Option<SourceId> {
        self.files.get(name).copied()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn source_ids(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.files.values().copied()
    }

    pub(crate) fn insert_file(&mut self, path: &Path, id: SourceId) {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            self.files.insert(name.to_string(), id);
        }
    }

    pub(crate) fn remove_file(&mut self, path: &Path) -> Option<SourceId> {
        let name = path.file_name().and_then(|n| n.to_str())?;
        self.files.remove(name)
    }
}

/// Folder type and configuration of the directory containing `path`.
pub fn folder_of(
    path: &Path,
    configs: &FolderConfigCache,
) -> Option<(ResourceFolderType, Arc<FolderConfiguration>)> {
    let dir_name = path.parent()?.file_name()?.to_str()?;
    configs.get(dir_name)
}

impl TableState {
    /// Bring the table in line with one file event.
    ///
    /// Parses synchronously under the caller's lock; the incremental
    /// repository parses outside the lock and calls
    /// [`commit_parse`](TableState::commit_parse) instead.
    pub(crate) fn process_file(
        &mut self,
        path: &Path,
        delta: DeltaKind,
        configs: &FolderConfigCache,
        parser: &dyn MarkupParser,
        ctx: &mut ScanContext,
    ) -> CommitResult {
        if delta == DeltaKind::Removed {
            return match self.remove_path(path, ctx) {
                Some(id) => CommitResult::Removed(id),
                None => CommitResult::Ignored,
            };
        }
        let Some((folder_type, configuration)) = folder_of(path, configs) else {
            return CommitResult::Ignored;
        };
        match parse_source(path, folder_type, &configuration, parser) {
            Ok(Some(outcome)) => self.commit_parse(path, folder_type, configuration, outcome, ctx),
            Ok(None) => match self.remove_path(path, ctx) {
                Some(id) => CommitResult::Removed(id),
                None => CommitResult::Ignored,
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => match self.remove_path(path, ctx) {
                Some(id) => CommitResult::Removed(id),
                None => CommitResult::Ignored,
            },
            Err(e) => {
                ctx.add_error(ScanError {
                    path: path.to_path_buf(),
                    line: 0,
                    message: e.to_string(),
                });
                CommitResult::Ignored
            }
        }
    }

    /// The source for `name` in `dir`, creating it if the file exists on
    /// disk but has not been seen yet.
    pub(crate) fn get_file(
        &mut self,
        dir: &Path,
        name: &str,
        configs: &FolderConfigCache,
        parser: &dyn MarkupParser,
        ctx: &mut ScanContext,
    ) -> Option<SourceId> {
        if let Some(id) = self.folders.get(dir).and_then(|f| f.file(name)) {
            return Some(id);
        }
        let path = dir.join(name);
        if !path.is_file() {
            return None;
        }
        match self.process_file(&path, DeltaKind::Added, configs, parser, ctx) {
            CommitResult::Added(id) | CommitResult::Updated(id, _) => Some(id),
            _ => None,
        }
    }

    /// Forget a folder and dispose all of its sources.
    pub(crate) fn remove_folder(&mut self, dir: &Path, ctx: &mut ScanContext) -> usize {
        let Some(folder) = self.folders.remove(dir) else {
            return 0;
        };
        let ids: Vec<SourceId> = folder.source_ids().collect();
        let mut removed = 0;
        for id in ids {
            if self.remove_source(id, ctx) {
                removed += 1;
            }
        }
        removed
    }
}
