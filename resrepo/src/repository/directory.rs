//! Directory-scanning repository for read-mostly resource trees.
//!
//! Nothing is read until the first query; [`ensure_initialized`] then scans
//! the whole root in one pass. Later changes are applied by explicit calls
//! (`process_file`, `process_folder`, `remove_folder`) followed by
//! [`post_update_cleanup`]. There is no background worker and no persistent
//! cache.
//!
//! [`ensure_initialized`]: DirectoryRepository::ensure_initialized
//! [`post_update_cleanup`]: DirectoryRepository::post_update_cleanup

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::loader;
use super::table::{CommitResult, ResourceTable};
use super::ResourceRepository;
use crate::config::RepositoryConfig;
use crate::configuration::FolderConfigCache;
use crate::error::RepositoryError;
use crate::folder::DeltaKind;
use crate::markup::{MarkupParser, QuickXmlParser};
use crate::source::{ScanContext, ScanError, SourceId};

/// Lazily scanned, explicitly updated repository.
pub struct DirectoryRepository {
    root: PathBuf,
    table: ResourceTable,
    configs: FolderConfigCache,
    parser: Arc<dyn MarkupParser>,
    parallel: bool,
    ignore_hidden: bool,
    initialized: Mutex<bool>,
    errors: Mutex<Vec<ScanError>>,
}

impl DirectoryRepository {
    /// Repository over `root` using the default markup parser.
    pub fn new(root: impl Into<PathBuf>, config: &RepositoryConfig) -> Result<Self, RepositoryError> {
        Self::with_parser(root, config, Arc::new(QuickXmlParser::new()))
    }

    pub fn with_parser(
        root: impl Into<PathBuf>,
        config: &RepositoryConfig,
        parser: Arc<dyn MarkupParser>,
    ) -> Result<Self, RepositoryError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(RepositoryError::InvalidRoot(root));
        }
        Ok(Self {
            root,
            table: ResourceTable::new(),
            configs: FolderConfigCache::new(),
            parser,
            parallel: config.parallel_initial_scan,
            ignore_hidden: config.ignore_hidden,
            initialized: Mutex::new(false),
            errors: Mutex::new(Vec::new()),
        })
    }

    /// Scan the root unless already done. Returns whether this call scanned.
    pub fn ensure_initialized(&self) -> bool {
        let mut initialized = self.initialized.lock();
        if *initialized {
            return false;
        }
        let started = Instant::now();
        let mut ctx = ScanContext::new();

        let files = match loader::collect_files(&self.root, &self.configs, self.ignore_hidden) {
            Ok(files) => files,
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "Failed to list resource root");
                ctx.add_error(ScanError {
                    path: self.root.clone(),
                    line: 0,
                    message: e.to_string(),
                });
                Vec::new()
            }
        };
        let (parsed, _) = loader::parse_files(files, self.parser.as_ref(), None, self.parallel);
        let committed = loader::commit_all(&mut self.table.lock(), parsed, &mut ctx);

        info!(
            root = %self.root.display(),
            sources = committed,
            errors = ctx.errors().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Directory repository loaded"
        );
        self.record(ctx);
        *initialized = true;
        true
    }

    pub fn is_initialized(&self) -> bool {
        *self.initialized.lock()
    }

    /// Drop everything; the next query scans again.
    pub fn clear(&self) {
        let mut initialized = self.initialized.lock();
        self.table.clear();
        self.errors.lock().clear();
        *initialized = false;
    }

    /// Clear and scan again.
    pub fn reload(&self) {
        self.clear();
        self.ensure_initialized();
    }

    /// Re-scan every file of one folder. Files that disappeared from it are
    /// removed. Returns how many sources were committed.
    pub fn process_folder(&self, dir: &Path) -> usize {
        self.ensure_initialized();
        let mut ctx = ScanContext::new();
        let files = match loader::collect_folder(dir, &self.configs) {
            Ok(files) => files,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "Folder not readable; removing");
                self.table.lock().remove_folder(dir, &mut ctx);
                self.record(ctx);
                return 0;
            }
        };
        let (parsed, _) = loader::parse_files(files, self.parser.as_ref(), None, false);

        let mut state = self.table.lock();
        let stale: Vec<PathBuf> = state
            .folders
            .get(dir)
            .map(|folder| {
                folder
                    .source_ids()
                    .filter_map(|id| state.sources.get(&id).map(|s| s.path().to_path_buf()))
                    .filter(|p| !parsed.iter().any(|f| &f.file.path == p))
                    .collect()
            })
            .unwrap_or_default();
        for path in stale {
            state.remove_path(&path, &mut ctx);
        }
        let committed = loader::commit_all(&mut state, parsed, &mut ctx);
        drop(state);

        self.record(ctx);
        committed
    }

    /// Apply one file event.
    pub fn process_file(&self, path: &Path, delta: DeltaKind) -> CommitResult {
        self.ensure_initialized();
        let mut ctx = ScanContext::new();
        let result =
            self.table
                .lock()
                .process_file(path, delta, &self.configs, self.parser.as_ref(), &mut ctx);
        self.record(ctx);
        result
    }

    /// Source of the file at `path`. A file not seen yet is parsed and
    /// registered on this first access.
    pub fn source_for(&self, path: &Path) -> Option<SourceId> {
        self.ensure_initialized();
        let dir = path.parent()?;
        let name = path.file_name()?.to_str()?;
        let mut ctx = ScanContext::new();
        let id = self
            .table
            .lock()
            .get_file(dir, name, &self.configs, self.parser.as_ref(), &mut ctx);
        self.record(ctx);
        id
    }

    /// Forget a folder and everything in it. Returns the number of sources
    /// removed.
    pub fn remove_folder(&self, dir: &Path) -> usize {
        self.ensure_initialized();
        let mut ctx = ScanContext::new();
        let removed = self.table.lock().remove_folder(dir, &mut ctx);
        self.record(ctx);
        removed
    }

    /// Drop items left without sources after a batch of updates.
    pub fn post_update_cleanup(&self) -> usize {
        let pruned = self.table.prune_empty_items();
        if pruned > 0 {
            debug!(pruned, "Pruned empty items");
        }
        pruned
    }

    /// Errors collected by every scan so far.
    pub fn errors(&self) -> Vec<ScanError> {
        self.errors.lock().clone()
    }

    fn record(&self, ctx: ScanContext) {
        if ctx.needs_full_rescan() {
            debug!(root = %self.root.display(), "Scan asked for a full rescan");
        }
        self.errors.lock().extend(ctx.errors().iter().cloned());
    }
}

impl ResourceRepository for DirectoryRepository {
    fn table(&self) -> &ResourceTable {
        self.ensure_initialized();
        &self.table
    }

    fn root(&self) -> &Path {
        &self.root
    }
}
