//! Incrementally updated repository over a live resource root.
//!
//! # Lifecycle
//!
//! ```text
//! open()                                  (blocking pool)
//!   ├── load persistent cache (header checked, per-file stamp hashes)
//!   ├── collect + parse files (cache hits skip parsing)
//!   ├── commit everything under one table lock
//!   ├── start the update worker
//!   └── stale cache? ──► spawn_blocking(write cache)      (never awaited by open)
//!
//! change events ──► schedule_scan / handle_document_change ──► UpdateQueue (FIFO)
//!                                                               │
//!                               parse outside lock ◄────────────┘
//!                               cancelled? drop : commit under lock
//! ```
//!
//! Every mutation after `open` returns runs on the single update worker, so
//! mutations are totally ordered. Readers take the table lock directly.
//!
//! # Supersession
//!
//! Scheduling a file that is already pending is a no-op. Scheduling a file
//! whose scan is running cancels that scan's token and queues a fresh one;
//! the running scan checks the token after parsing and skips its commit.
//! A scan that already holds the table lock always finishes.

use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::loader;
use super::table::{CommitResult, ResourceTable};
use super::ResourceRepository;
use crate::cache::{self, write_cache_file, CacheHeader, CacheLoadStats, ResourceCache};
use crate::changes::{ChangeEvent, ChangeTarget, DocumentChange, FileEventKind};
use crate::config::RepositoryConfig;
use crate::configuration::FolderConfigCache;
use crate::error::{CacheError, RepositoryError};
use crate::folder::folder_of;
use crate::markup::{MarkupParser, QuickXmlParser};
use crate::resource::{ResourceFolderType, ResourceType, ResourceValue};
use crate::scheduler::{ScanState, ScanTracker, UpdateQueue};
use crate::source::{parse_source, ScanContext, ScanError};

/// How a document change was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditDisposition {
    /// A scan of the file was already pending and will pick the change up.
    Absorbed,
    /// The change could not be applied in place; a rescan was scheduled.
    Rescan,
    /// An in-place edit was queued.
    Edit,
    /// Nothing to do (whitespace, or a file outside any resource folder).
    Ignored,
}

/// Counters describing a repository's work so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepositoryStats {
    /// Parsable files loaded by `open`, from cache or source.
    pub files_loaded_initially: usize,
    /// Of those, files that had to be parsed.
    pub files_loaded_from_sources: usize,
    /// Whether `open` found a cache within the staleness threshold.
    pub has_fresh_file_cache: bool,
    /// Scans committed after `open`.
    pub file_rescans: u64,
    /// Scans dropped because a newer request superseded them.
    pub scans_cancelled: u64,
    /// In-place document edits applied.
    pub document_edits: u64,
}

/// An in-place edit of one values file.
#[derive(Debug)]
enum ValueEdit {
    SetText {
        resource_type: ResourceType,
        name: String,
        text: String,
    },
    Rename {
        resource_type: ResourceType,
        old_name: String,
        new_name: String,
    },
    Add {
        resource_type: ResourceType,
        name: String,
        value: ResourceValue,
    },
    Remove {
        resource_type: ResourceType,
        name: String,
    },
    Replace {
        resource_type: ResourceType,
        name: String,
        value: ResourceValue,
    },
}

impl ValueEdit {
    /// The in-place edit for a document change, or `None` when only a
    /// rescan is safe.
    fn from_change(change: &DocumentChange) -> Option<Self> {
        let target = change.target()?;
        match target {
            ChangeTarget::ValueText {
                resource_type,
                name,
                text,
            } => Some(ValueEdit::SetText {
                resource_type: *resource_type,
                name: name.clone(),
                text: text.clone(),
            }),
            ChangeTarget::ValueName {
                resource_type,
                old_name,
                new_name,
            } => Some(ValueEdit::Rename {
                resource_type: *resource_type,
                old_name: old_name.clone(),
                new_name: new_name.clone(),
            }),
            ChangeTarget::ValueElement {
                resource_type,
                name,
                value,
            } => match (change, value) {
                (DocumentChange::ChildAdded { .. }, Some(value)) => Some(ValueEdit::Add {
                    resource_type: *resource_type,
                    name: name.clone(),
                    value: value.clone(),
                }),
                (DocumentChange::ChildRemoved { .. }, _) => Some(ValueEdit::Remove {
                    resource_type: *resource_type,
                    name: name.clone(),
                }),
                (DocumentChange::ChildReplaced { .. }, Some(value)) => Some(ValueEdit::Replace {
                    resource_type: *resource_type,
                    name: name.clone(),
                    value: value.clone(),
                }),
                _ => None,
            },
            ChangeTarget::Whitespace | ChangeTarget::Structure => None,
        }
    }
}

struct Inner {
    root: PathBuf,
    config: RepositoryConfig,
    table: ResourceTable,
    configs: FolderConfigCache,
    parser: Arc<dyn MarkupParser>,
    tracker: ScanTracker,
    queue: UpdateQueue,
    runtime: Handle,
    shutdown: CancellationToken,
    errors: Mutex<Vec<ScanError>>,
    needs_full_rescan: AtomicBool,
    files_loaded_initially: usize,
    files_loaded_from_sources: usize,
    fresh_cache: bool,
    file_rescans: AtomicU64,
    scans_cancelled: AtomicU64,
    document_edits: AtomicU64,
    cache_writes: Mutex<Vec<JoinHandle<()>>>,
}

/// Incremental repository. Cheap to clone; clones share one table and one
/// update worker.
#[derive(Clone)]
pub struct ResourceFolderRepository {
    inner: Arc<Inner>,
}

impl ResourceFolderRepository {
    /// Open a repository with the default markup parser.
    ///
    /// Must be called inside a tokio runtime, which drives the update worker
    /// and background cache writes. The directory walk, cache read and
    /// initial parse run on the blocking pool.
    pub async fn open(root: impl Into<PathBuf>, config: RepositoryConfig) -> Result<Self, RepositoryError> {
        Self::open_with_parser(root, config, Arc::new(QuickXmlParser::new())).await
    }

    pub async fn open_with_parser(
        root: impl Into<PathBuf>,
        config: RepositoryConfig,
        parser: Arc<dyn MarkupParser>,
    ) -> Result<Self, RepositoryError> {
        let runtime = Handle::try_current().map_err(|_| RepositoryError::NoRuntime)?;
        let root = root.into();
        let load_parser = Arc::clone(&parser);
        let loaded = runtime
            .spawn_blocking(move || initial_load(root, config, load_parser.as_ref()))
            .await
            .map_err(|e| RepositoryError::LoadTask(e.to_string()))??;

        let InitialLoad {
            root,
            config,
            configs,
            table,
            stats,
            fresh_cache,
            cache_path,
            ctx,
        } = loaded;

        let (queue, _worker) = UpdateQueue::start(&runtime);
        let repo = Self {
            inner: Arc::new(Inner {
                root,
                config,
                table,
                configs,
                parser,
                tracker: ScanTracker::new(),
                queue,
                runtime,
                shutdown: CancellationToken::new(),
                errors: Mutex::new(Vec::new()),
                needs_full_rescan: AtomicBool::new(false),
                files_loaded_initially: stats.parsable_files,
                files_loaded_from_sources: stats.misses,
                fresh_cache,
                file_rescans: AtomicU64::new(0),
                scans_cancelled: AtomicU64::new(0),
                document_edits: AtomicU64::new(0),
                cache_writes: Mutex::new(Vec::new()),
            }),
        };
        repo.inner.record(ctx);

        if !fresh_cache {
            if let Some(path) = cache_path {
                repo.spawn_cache_write(path);
            }
        }
        Ok(repo)
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.inner.config
    }

    // -------------------------------------------------------------------------
    // Scheduling
    // -------------------------------------------------------------------------

    /// Queue a rescan of `path`, typed by its folder. Returns `false` if the
    /// path is not inside a valid resource folder, a scan is already
    /// pending, or the worker has stopped.
    pub fn schedule_scan(&self, path: &Path) -> bool {
        self.inner.schedule_scan(path)
    }

    /// Queue a rescan of `path` as a file of `folder_type`.
    pub fn schedule_scan_as(&self, path: &Path, folder_type: ResourceFolderType) -> bool {
        self.inner.schedule_scan_as(path, folder_type)
    }

    pub fn on_file_created(&self, path: &Path) {
        if path.is_dir() {
            match loader::collect_folder(path, &self.inner.configs) {
                Ok(files) => {
                    for file in files {
                        self.inner.schedule_scan_as(&file.path, file.folder_type);
                    }
                }
                Err(e) => debug!(dir = %path.display(), error = %e, "New folder not readable"),
            }
        } else {
            self.inner.schedule_scan(path);
        }
    }

    pub fn on_file_changed(&self, path: &Path) {
        if !path.is_dir() {
            self.inner.schedule_scan(path);
        }
    }

    /// Forget a file, a folder, or every folder below a directory.
    pub fn on_file_or_directory_removed(&self, path: &Path) {
        let inner = Arc::clone(&self.inner);
        let path = path.to_path_buf();
        self.inner
            .queue
            .schedule("remove", move || inner.remove_path_or_dir(&path));
    }

    /// React to an edit of an open document.
    ///
    /// Edits that keep a values file's names provably consistent are applied
    /// in place on the update worker; anything else rescans the file.
    pub fn handle_document_change(&self, change: DocumentChange) -> EditDisposition {
        let file = change.file().to_path_buf();
        match self.inner.tracker.state(&file) {
            ScanState::Pending => {
                trace!(path = %file.display(), "Change absorbed by pending scan");
                return EditDisposition::Absorbed;
            }
            ScanState::Running => {
                self.inner.schedule_scan(&file);
                return EditDisposition::Rescan;
            }
            ScanState::Idle => {}
        }

        let Some((folder_type, _)) = folder_of(&file, &self.inner.configs) else {
            return EditDisposition::Ignored;
        };
        if matches!(change.target(), Some(ChangeTarget::Whitespace)) {
            return EditDisposition::Ignored;
        }
        if folder_type != ResourceFolderType::Values {
            self.inner.schedule_scan_as(&file, folder_type);
            return EditDisposition::Rescan;
        }
        let Some(edit) = ValueEdit::from_change(&change) else {
            self.inner.schedule_scan_as(&file, folder_type);
            return EditDisposition::Rescan;
        };

        let inner = Arc::clone(&self.inner);
        if self
            .inner
            .queue
            .schedule("edit", move || inner.apply_edit(&file, edit))
        {
            EditDisposition::Edit
        } else {
            EditDisposition::Ignored
        }
    }

    /// Dispatch one change event.
    pub fn apply_change(&self, event: ChangeEvent) {
        match event {
            ChangeEvent::File(event) => match event.kind {
                FileEventKind::Created => self.on_file_created(&event.path),
                FileEventKind::Modified => self.on_file_changed(&event.path),
                FileEventKind::Removed => self.on_file_or_directory_removed(&event.path),
            },
            ChangeEvent::Document(change) => {
                self.handle_document_change(change);
            }
        }
    }

    /// Consume a change stream until it closes or the repository shuts down.
    pub fn listen(&self, mut rx: mpsc::UnboundedReceiver<ChangeEvent>) -> JoinHandle<()> {
        let repo = self.clone();
        let shutdown = self.inner.shutdown.clone();
        self.inner.runtime.spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    _ = shutdown.cancelled() => break,

                    event = rx.recv() => match event {
                        Some(event) => repo.apply_change(event),
                        None => break,
                    }
                }
            }
            debug!(root = %repo.inner.root.display(), "Change listener stopped");
        })
    }

    // -------------------------------------------------------------------------
    // Synchronisation
    // -------------------------------------------------------------------------

    /// Run `callback` on the update worker after every job queued so far.
    pub fn invoke_after_pending_updates_finish<F>(&self, callback: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.queue.schedule("callback", callback)
    }

    /// Wait until the queue has drained and no scan is pending, including
    /// scans queued by the jobs that ran meanwhile.
    pub async fn wait_for_pending_updates(&self) {
        loop {
            if self.inner.queue.barrier().await.is_err() {
                return;
            }
            if self.inner.tracker.pending_count() == 0 {
                return;
            }
        }
    }

    /// Stop the update worker and the change listener. Queued jobs are
    /// dropped.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.queue.shutdown();
        self.inner.tracker.clear();
        info!(root = %self.inner.root.display(), "Resource repository shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    // -------------------------------------------------------------------------
    // Persistent cache
    // -------------------------------------------------------------------------

    /// Write the cache file now. No-op when caching is disabled.
    pub fn write_cache(&self) -> Result<(), RepositoryError> {
        let Some(path) = self.inner.config.cache_file_for(&self.inner.root) else {
            return Ok(());
        };
        let body = cache::snapshot(&self.inner.table.lock(), &self.inner.root);
        let header = CacheHeader::new(&self.inner.root, &self.inner.config.code_version);
        write_cache_file(&path, &header, &body)?;
        Ok(())
    }

    /// Wait for background cache writes started by `open`.
    pub async fn flush_cache_writes(&self) {
        let handles = std::mem::take(&mut *self.inner.cache_writes.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Cache write task failed");
            }
        }
    }

    fn spawn_cache_write(&self, path: PathBuf) {
        let body = cache::snapshot(&self.inner.table.lock(), &self.inner.root);
        let header = CacheHeader::new(&self.inner.root, &self.inner.config.code_version);
        let handle = self.inner.runtime.spawn_blocking(move || {
            match write_cache_file(&path, &header, &body) {
                Ok(()) => info!(path = %path.display(), sources = body.sources.len(), "Resource cache rewritten"),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to write resource cache"),
            }
        });
        self.inner.cache_writes.lock().push(handle);
    }

    // -------------------------------------------------------------------------
    // Stats
    // -------------------------------------------------------------------------

    pub fn stats(&self) -> RepositoryStats {
        RepositoryStats {
            files_loaded_initially: self.inner.files_loaded_initially,
            files_loaded_from_sources: self.inner.files_loaded_from_sources,
            has_fresh_file_cache: self.inner.fresh_cache,
            file_rescans: self.inner.file_rescans.load(Ordering::Relaxed),
            scans_cancelled: self.inner.scans_cancelled.load(Ordering::Relaxed),
            document_edits: self.inner.document_edits.load(Ordering::Relaxed),
        }
    }

    pub fn file_rescans(&self) -> u64 {
        self.inner.file_rescans.load(Ordering::Relaxed)
    }

    pub fn files_loaded_initially(&self) -> usize {
        self.inner.files_loaded_initially
    }

    pub fn files_loaded_from_sources(&self) -> usize {
        self.inner.files_loaded_from_sources
    }

    pub fn has_fresh_file_cache(&self) -> bool {
        self.inner.fresh_cache
    }

    pub fn pending_scans(&self) -> usize {
        self.inner.tracker.pending_count()
    }

    /// Scan errors collected so far.
    pub fn errors(&self) -> Vec<ScanError> {
        self.inner.errors.lock().clone()
    }

    /// Whether any scan failed to establish a file's identity.
    pub fn needs_full_rescan(&self) -> bool {
        self.inner.needs_full_rescan.load(Ordering::Relaxed)
    }
}

impl ResourceRepository for ResourceFolderRepository {
    fn table(&self) -> &ResourceTable {
        &self.inner.table
    }

    fn root(&self) -> &Path {
        &self.inner.root
    }
}

impl Inner {
    fn schedule_scan(self: &Arc<Self>, path: &Path) -> bool {
        match folder_of(path, &self.configs) {
            Some((folder_type, _)) => self.schedule_scan_as(path, folder_type),
            None => {
                trace!(path = %path.display(), "Not inside a resource folder");
                false
            }
        }
    }

    fn schedule_scan_as(self: &Arc<Self>, path: &Path, folder_type: ResourceFolderType) -> bool {
        if !self.tracker.mark_pending(path) {
            trace!(path = %path.display(), "Scan already pending");
            return false;
        }
        let inner = Arc::clone(self);
        let owned = path.to_path_buf();
        let scheduled = self
            .queue
            .schedule("scan", move || inner.run_scan(&owned, folder_type));
        if !scheduled {
            self.tracker.forget(path);
        }
        scheduled
    }

    /// Body of a scheduled scan; runs on the update worker.
    fn run_scan(&self, path: &Path, folder_type: ResourceFolderType) {
        let Some(ticket) = self.tracker.begin(path) else {
            return;
        };
        let Some((_, configuration)) = folder_of(path, &self.configs) else {
            self.tracker.finish(path, &ticket);
            return;
        };

        let parsed = parse_source(path, folder_type, &configuration, self.parser.as_ref());
        if ticket.is_cancelled() {
            self.scans_cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(path = %path.display(), "Scan superseded before commit");
            self.tracker.finish(path, &ticket);
            return;
        }

        let mut ctx = ScanContext::new();
        let result = {
            let mut state = self.table.lock();
            match parsed {
                Ok(Some(outcome)) => {
                    state.commit_parse(path, folder_type, configuration, outcome, &mut ctx)
                }
                Ok(None) => removal(state.remove_path(path, &mut ctx)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    removal(state.remove_path(path, &mut ctx))
                }
                Err(e) => {
                    ctx.add_error(ScanError {
                        path: path.to_path_buf(),
                        line: 0,
                        message: e.to_string(),
                    });
                    CommitResult::Ignored
                }
            }
        };

        self.file_rescans.fetch_add(1, Ordering::Relaxed);
        self.tracker.finish(path, &ticket);
        debug!(path = %path.display(), result = ?result, "Rescanned file");
        self.record(ctx);
    }

    /// Apply an in-place edit; falls back to a rescan if the file's source
    /// does not hold what the edit expects.
    fn apply_edit(self: &Arc<Self>, path: &Path, edit: ValueEdit) {
        let applied = {
            let mut guard = self.table.lock();
            let state = &mut *guard;
            match state
                .source_id(path)
                .and_then(|id| state.sources.get_mut(&id))
            {
                Some(source) => {
                    let index = &mut state.index;
                    match &edit {
                        ValueEdit::SetText {
                            resource_type,
                            name,
                            text,
                        } => source.set_value_text(*resource_type, name, text, index),
                        ValueEdit::Rename {
                            resource_type,
                            old_name,
                            new_name,
                        } => source.rename_value(*resource_type, old_name, new_name, index),
                        ValueEdit::Add {
                            resource_type,
                            name,
                            value,
                        } => source.add_value(*resource_type, name, value.clone(), index),
                        ValueEdit::Remove {
                            resource_type,
                            name,
                        } => source.remove_value(*resource_type, name, index),
                        ValueEdit::Replace {
                            resource_type,
                            name,
                            value,
                        } => source.replace_value(*resource_type, name, value.clone(), index),
                    }
                }
                None => false,
            }
        };

        if applied {
            self.document_edits.fetch_add(1, Ordering::Relaxed);
            trace!(path = %path.display(), edit = ?edit, "Applied in-place edit");
        } else {
            debug!(path = %path.display(), edit = ?edit, "In-place edit not applicable; rescanning");
            self.schedule_scan_as(path, ResourceFolderType::Values);
        }
    }

    fn remove_path_or_dir(&self, path: &Path) {
        let mut ctx = ScanContext::new();
        let removed = {
            let mut state = self.table.lock();
            if state.folders.contains_key(path) {
                state.remove_folder(path, &mut ctx)
            } else if state.remove_path(path, &mut ctx).is_some() {
                1
            } else {
                let dirs: Vec<PathBuf> = state
                    .folders
                    .keys()
                    .filter(|dir| dir.starts_with(path))
                    .cloned()
                    .collect();
                dirs.iter()
                    .map(|dir| state.remove_folder(dir, &mut ctx))
                    .sum()
            }
        };
        debug!(path = %path.display(), removed, "Processed removal");
        self.record(ctx);
    }

    fn record(&self, ctx: ScanContext) {
        if ctx.needs_full_rescan() && !self.needs_full_rescan.swap(true, Ordering::Relaxed) {
            warn!(root = %self.root.display(), "Malformed resource file; a full rescan is advised");
        }
        if ctx.has_errors() {
            self.errors.lock().extend(ctx.errors().iter().cloned());
        }
    }
}

fn removal(id: Option<crate::source::SourceId>) -> CommitResult {
    match id {
        Some(id) => CommitResult::Removed(id),
        None => CommitResult::Ignored,
    }
}

/// Everything `open` computes before the worker starts.
struct InitialLoad {
    root: PathBuf,
    config: RepositoryConfig,
    configs: FolderConfigCache,
    table: ResourceTable,
    stats: CacheLoadStats,
    fresh_cache: bool,
    cache_path: Option<PathBuf>,
    ctx: ScanContext,
}

/// Read the cache, walk the root and commit every file. Blocking.
fn initial_load(
    root: PathBuf,
    config: RepositoryConfig,
    parser: &dyn MarkupParser,
) -> Result<InitialLoad, RepositoryError> {
    let root = absolute_root(root)?;
    let started = Instant::now();

    let configs = FolderConfigCache::new();
    let table = ResourceTable::new();
    let header = CacheHeader::new(&root, &config.code_version);
    let cache_path = config.cache_file_for(&root);
    let cache = cache_path
        .as_deref()
        .and_then(|path| load_cache(path, &header, &configs));

    let files = loader::collect_files(&root, &configs, config.ignore_hidden)?;
    let (parsed, stats) =
        loader::parse_files(files, parser, cache.as_ref(), config.parallel_initial_scan);
    let mut ctx = ScanContext::new();
    let committed = loader::commit_all(&mut table.lock(), parsed, &mut ctx);

    let fresh_cache = cache.is_some() && !stats.is_stale(config.staleness_threshold);
    info!(
        root = %root.display(),
        sources = committed,
        parsable = stats.parsable_files,
        cache_hits = stats.hits,
        cache_misses = stats.misses,
        miss_ratio = stats.miss_ratio(),
        fresh_cache,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Resource repository loaded"
    );

    Ok(InitialLoad {
        root,
        config,
        configs,
        table,
        stats,
        fresh_cache,
        cache_path,
        ctx,
    })
}

fn absolute_root(root: PathBuf) -> Result<PathBuf, RepositoryError> {
    if !root.is_dir() {
        return Err(RepositoryError::InvalidRoot(root));
    }
    if root.is_absolute() {
        Ok(root)
    } else {
        Ok(std::fs::canonicalize(&root)?)
    }
}

fn load_cache(path: &Path, header: &CacheHeader, configs: &FolderConfigCache) -> Option<ResourceCache> {
    match ResourceCache::load(path, header, configs) {
        Ok(cache) => {
            debug!(path = %path.display(), entries = cache.len(), "Loaded resource cache");
            Some(cache)
        }
        Err(CacheError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No resource cache yet");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Discarding resource cache");
            None
        }
    }
}
