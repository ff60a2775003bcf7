//! The aggregation table shared by both repository strategies.
//!
//! All mutable state lives behind one coarse `parking_lot::Mutex`:
//!
//! ```text
//! TableState
//! ├── index     type -> name -> [SourceId]   (items, pruned when empty)
//! ├── sources   SourceId -> Source           (owns contributions)
//! ├── by_path   path -> SourceId
//! ├── folders   dir -> ResourceFolder        (dir -> file name -> SourceId)
//! └── views     type -> (generation, Arc<[ItemView]>)
//! ```
//!
//! Items refer to sources by id only. Removing a source detaches its ids from
//! the index and prunes items left with no sources before the lock is
//! released, so readers never observe an empty item.

use parking_lot::{Mutex, MutexGuard};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::configuration::{Configurable, FolderConfiguration};
use crate::folder::ResourceFolder;
use crate::pseudolocale::{is_pseudolocalizable, pseudolocale_configuration, PseudoMethod};
use crate::resource::{ResourceFolderType, ResourceType, ResourceUrl, ResourceValue};
use crate::source::{FileStamp, ParseOutcome, ScanContext, Source, SourceId, SourceKind};

/// Resolved resources for one configuration: type -> name -> value.
pub type ConfiguredResources = BTreeMap<ResourceType, BTreeMap<String, ResourceValue>>;

// =============================================================================
// Item index
// =============================================================================

/// Items and the sources contributing to each.
#[derive(Debug, Default)]
pub(crate) struct ItemIndex {
    items: HashMap<ResourceType, BTreeMap<String, Vec<SourceId>>>,
    generation: u64,
    id_generation: u64,
}

impl ItemIndex {
    pub(crate) fn attach(&mut self, resource_type: ResourceType, name: &str, id: SourceId) {
        let sources = self
            .items
            .entry(resource_type)
            .or_default()
            .entry(name.to_string())
            .or_default();
        if !sources.contains(&id) {
            sources.push(id);
        }
        self.touch();
    }

    /// Detach a source; prunes the item when it has no sources left.
    pub(crate) fn detach(&mut self, resource_type: ResourceType, name: &str, id: SourceId) {
        let Some(by_name) = self.items.get_mut(&resource_type) else {
            return;
        };
        if let Some(sources) = by_name.get_mut(name) {
            sources.retain(|s| *s != id);
            if sources.is_empty() {
                by_name.remove(name);
            }
        }
        if by_name.is_empty() {
            self.items.remove(&resource_type);
        }
        self.touch();
    }

    /// Create an item with no sources if absent. Returns whether it was
    /// created.
    pub(crate) fn get_or_create(&mut self, resource_type: ResourceType, name: &str) -> bool {
        let by_name = self.items.entry(resource_type).or_default();
        if by_name.contains_key(name) {
            return false;
        }
        by_name.insert(name.to_string(), Vec::new());
        self.touch();
        true
    }

    pub(crate) fn sources_of(&self, resource_type: ResourceType, name: &str) -> Option<&[SourceId]> {
        self.items
            .get(&resource_type)
            .and_then(|m| m.get(name))
            .map(Vec::as_slice)
    }

    pub(crate) fn items_of(&self, resource_type: ResourceType) -> Option<&BTreeMap<String, Vec<SourceId>>> {
        self.items.get(&resource_type)
    }

    /// Drop every item without sources. Returns how many were dropped.
    pub(crate) fn prune_empty(&mut self) -> usize {
        let mut pruned = 0;
        for by_name in self.items.values_mut() {
            let before = by_name.len();
            by_name.retain(|_, sources| !sources.is_empty());
            pruned += before - by_name.len();
        }
        self.items.retain(|_, by_name| !by_name.is_empty());
        if pruned > 0 {
            self.touch();
        }
        pruned
    }

    pub(crate) fn touch(&mut self) {
        self.generation += 1;
    }

    pub(crate) fn bump_id_generation(&mut self) {
        self.id_generation += 1;
        self.touch();
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn id_generation(&self) -> u64 {
        self.id_generation
    }

    fn item_count(&self) -> usize {
        self.items.values().map(BTreeMap::len).sum()
    }

    fn clear(&mut self) {
        self.items.clear();
        self.bump_id_generation();
    }
}

// =============================================================================
// Views
// =============================================================================

/// A source as seen from an item.
#[derive(Debug, Clone)]
pub struct SourceRef {
    pub id: SourceId,
    pub path: PathBuf,
    pub configuration: Arc<FolderConfiguration>,
    /// Whether the file is itself the resource, as opposed to a values file.
    pub file: bool,
}

impl Configurable for SourceRef {
    fn configuration(&self) -> &FolderConfiguration {
        &self.configuration
    }
}

/// Read-only snapshot of one item.
#[derive(Debug, Clone)]
pub struct ItemView {
    pub resource_type: ResourceType,
    pub name: String,
    pub sources: Vec<SourceRef>,
}

impl ItemView {
    /// Whether one of the sources has the default configuration.
    pub fn has_default(&self) -> bool {
        self.sources.iter().any(|s| s.configuration.is_default())
    }

    /// Whether any source is qualified.
    pub fn has_alternates(&self) -> bool {
        self.sources.iter().any(|s| !s.configuration.is_default())
    }

    /// Number of qualified sources.
    pub fn alternate_count(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| !s.configuration.is_default())
            .count()
    }
}

/// A resolved value with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedResource {
    pub value: ResourceValue,
    pub path: PathBuf,
    pub configuration: FolderConfiguration,
}

// =============================================================================
// Table state
// =============================================================================

/// Outcome of committing one parsed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitResult {
    Added(SourceId),
    /// The bool is whether the contributed name set changed.
    Updated(SourceId, bool),
    Removed(SourceId),
    Ignored,
}

/// State guarded by the table lock.
#[derive(Debug, Default)]
pub(crate) struct TableState {
    pub(crate) index: ItemIndex,
    pub(crate) sources: HashMap<SourceId, Source>,
    pub(crate) by_path: HashMap<PathBuf, SourceId>,
    pub(crate) folders: BTreeMap<PathBuf, ResourceFolder>,
    next_id: u64,
    views: HashMap<ResourceType, (u64, Arc<[ItemView]>)>,
}

impl TableState {
    fn allocate_id(&mut self) -> SourceId {
        self.next_id += 1;
        SourceId(self.next_id)
    }

    pub(crate) fn source_id(&self, path: &Path) -> Option<SourceId> {
        self.by_path.get(path).copied()
    }

    /// Register a folder if it is not known yet.
    pub(crate) fn ensure_folder(
        &mut self,
        dir: &Path,
        folder_type: ResourceFolderType,
        configuration: Arc<FolderConfiguration>,
    ) -> &mut ResourceFolder {
        self.folders
            .entry(dir.to_path_buf())
            .or_insert_with(|| ResourceFolder::new(folder_type, configuration, dir.to_path_buf()))
    }

    /// Create, load and register a source.
    pub(crate) fn add_source(
        &mut self,
        path: &Path,
        folder_type: ResourceFolderType,
        configuration: Arc<FolderConfiguration>,
        kind: SourceKind,
        stamp: Option<FileStamp>,
        ctx: &mut ScanContext,
    ) -> SourceId {
        let id = self.allocate_id();
        let mut source = Source::new(
            id,
            path.to_path_buf(),
            folder_type,
            Arc::clone(&configuration),
            kind,
            stamp,
        );
        source.load(ctx, &mut self.index);
        self.sources.insert(id, source);
        self.by_path.insert(path.to_path_buf(), id);

        if let Some(dir) = path.parent() {
            let folder = self.ensure_folder(dir, folder_type, configuration);
            folder.insert_file(path, id);
        }
        id
    }

    /// Replace a source's contributions. Returns whether the name set changed.
    pub(crate) fn update_source(
        &mut self,
        id: SourceId,
        kind: SourceKind,
        stamp: Option<FileStamp>,
        ctx: &mut ScanContext,
    ) -> bool {
        match self.sources.get_mut(&id) {
            Some(source) => source.update(kind, stamp, ctx, &mut self.index),
            None => false,
        }
    }

    /// Dispose a source and forget it. Items left without sources are pruned.
    pub(crate) fn remove_source(&mut self, id: SourceId, ctx: &mut ScanContext) -> bool {
        let Some(mut source) = self.sources.remove(&id) else {
            return false;
        };
        source.dispose(ctx, &mut self.index);
        self.by_path.remove(source.path());
        if let Some(dir) = source.path().parent() {
            if let Some(folder) = self.folders.get_mut(dir) {
                folder.remove_file(source.path());
            }
        }
        true
    }

    /// Apply a parse result for `path`: add, update or remove its source.
    pub(crate) fn commit_parse(
        &mut self,
        path: &Path,
        folder_type: ResourceFolderType,
        configuration: Arc<FolderConfiguration>,
        outcome: ParseOutcome,
        ctx: &mut ScanContext,
    ) -> CommitResult {
        let had_errors = !outcome.errors.is_empty() || outcome.needs_full_rescan;
        ctx.absorb(outcome.errors, outcome.needs_full_rescan);
        let existing = self.source_id(path);
        let result = match (outcome.kind, existing) {
            (Some(kind), Some(id)) => {
                let changed = self.update_source(id, kind, outcome.stamp, ctx);
                CommitResult::Updated(id, changed)
            }
            (Some(kind), None) => CommitResult::Added(self.add_source(
                path,
                folder_type,
                configuration,
                kind,
                outcome.stamp,
                ctx,
            )),
            (None, Some(id)) => {
                self.remove_source(id, ctx);
                CommitResult::Removed(id)
            }
            (None, None) => CommitResult::Ignored,
        };
        if let CommitResult::Added(id) | CommitResult::Updated(id, _) = result {
            if let Some(source) = self.sources.get_mut(&id) {
                source.set_had_errors(had_errors);
            }
        }
        result
    }

    /// Remove the source at `path`, if any.
    pub(crate) fn remove_path(&mut self, path: &Path, ctx: &mut ScanContext) -> Option<SourceId> {
        let id = self.source_id(path)?;
        self.remove_source(id, ctx);
        Some(id)
    }

    /// Sources of an item, in attachment order.
    fn item_sources(&self, resource_type: ResourceType, name: &str) -> Vec<&Source> {
        self.index
            .sources_of(resource_type, name)
            .map(|ids| ids.iter().filter_map(|id| self.sources.get(id)).collect())
            .unwrap_or_default()
    }

    fn best_source(
        &self,
        resource_type: ResourceType,
        name: &str,
        target: &FolderConfiguration,
    ) -> Option<&Source> {
        let candidates = self.item_sources(resource_type, name);
        target.find_matching(&candidates).copied()
    }

    /// Items with at least one live source.
    fn build_view(&self, resource_type: ResourceType) -> Arc<[ItemView]> {
        let Some(items) = self.index.items_of(resource_type) else {
            return Arc::from(Vec::new());
        };
        items
            .iter()
            .filter_map(|(name, ids)| {
                let sources: Vec<SourceRef> = ids
                    .iter()
                    .filter_map(|id| self.sources.get(id))
                    .map(|s| SourceRef {
                        id: s.id(),
                        path: s.path().to_path_buf(),
                        configuration: Arc::clone(s.configuration_arc()),
                        file: !matches!(s.kind(), SourceKind::MultiValueFile { .. }),
                    })
                    .collect();
                (!sources.is_empty()).then(|| ItemView {
                    resource_type,
                    name: name.clone(),
                    sources,
                })
            })
            .collect::<Vec<_>>()
            .into()
    }

    /// The value `source` contributes for (type, name) as seen from
    /// `target`, pseudolocalized when `target` asks for a pseudolocale.
    fn resolved_from(
        source: &Source,
        resource_type: ResourceType,
        name: &str,
        target: &FolderConfiguration,
    ) -> Option<ResolvedResource> {
        let value = source.value(resource_type, name)?;
        let pseudo = PseudoMethod::for_configuration(target)
            .filter(|_| {
                is_pseudolocalizable(
                    source.configuration(),
                    source.path(),
                    source.kind().is_translatable(resource_type, name),
                )
            })
            .and_then(|method| method.apply_value(resource_type, &value).map(|v| (method, v)));
        Some(match pseudo {
            Some((method, value)) => ResolvedResource {
                value,
                path: source.path().to_path_buf(),
                configuration: pseudolocale_configuration(source.configuration(), method),
            },
            None => ResolvedResource {
                value,
                path: source.path().to_path_buf(),
                configuration: source.configuration().clone(),
            },
        })
    }

    pub(crate) fn clear(&mut self) {
        self.sources.clear();
        self.by_path.clear();
        self.folders.clear();
        self.views.clear();
        self.index.clear();
    }
}

// =============================================================================
// ResourceTable
// =============================================================================

/// Thread-safe item table with best-match queries.
#[derive(Debug, Default)]
pub struct ResourceTable {
    state: Mutex<TableState>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive access for multi-step mutations.
    pub(crate) fn lock(&self) -> MutexGuard<'_, TableState> {
        self.state.lock()
    }

    /// Make sure an item exists, with or without sources.
    pub fn get_or_create_item(&self, resource_type: ResourceType, name: &str) {
        self.state.lock().index.get_or_create(resource_type, name);
    }

    /// Snapshot of every item of a type, sorted by name.
    ///
    /// The snapshot is rebuilt only when the table changed since the last
    /// call for this type.
    pub fn items_of_type(&self, resource_type: ResourceType) -> Arc<[ItemView]> {
        let mut state = self.state.lock();
        let generation = state.index.generation();
        if let Some((built_at, view)) = state.views.get(&resource_type) {
            if *built_at == generation {
                return Arc::clone(view);
            }
        }
        let view = state.build_view(resource_type);
        state
            .views
            .insert(resource_type, (generation, Arc::clone(&view)));
        view
    }

    /// Whether an item exists with at least one source.
    pub fn has_resource_item(&self, resource_type: ResourceType, name: &str) -> bool {
        self.state
            .lock()
            .index
            .sources_of(resource_type, name)
            .is_some_and(|s| !s.is_empty())
    }

    /// Whether a reference such as `@string/app_name` or `?colorPrimary`
    /// points at an item of this table. Framework references never do.
    pub fn has_resource_url(&self, url: &str) -> bool {
        match ResourceUrl::parse(url) {
            Some(url) if url.namespace.is_none() => {
                self.has_resource_item(url.resource_type, &url.name)
            }
            _ => false,
        }
    }

    pub fn has_resources_of_type(&self, resource_type: ResourceType) -> bool {
        self.state
            .lock()
            .index
            .items_of(resource_type)
            .is_some_and(|items| items.values().any(|s| !s.is_empty()))
    }

    /// Types with at least one sourced item.
    pub fn available_types(&self) -> Vec<ResourceType> {
        let state = self.state.lock();
        ResourceType::ALL
            .into_iter()
            .filter(|t| {
                state
                    .index
                    .items_of(*t)
                    .is_some_and(|items| items.values().any(|s| !s.is_empty()))
            })
            .collect()
    }

    /// Languages named by any folder configuration.
    pub fn languages(&self) -> BTreeSet<String> {
        let state = self.state.lock();
        state
            .folders
            .values()
            .filter_map(|f| f.configuration().language().map(str::to_string))
            .collect()
    }

    /// Regions used together with `language`.
    pub fn regions(&self, language: &str) -> BTreeSet<String> {
        let state = self.state.lock();
        state
            .folders
            .values()
            .map(|f| f.configuration())
            .filter(|c| c.language() == Some(language))
            .filter_map(|c| c.region().map(str::to_string))
            .collect()
    }

    /// Files backing an item: all of them, or only the best match for
    /// `target`.
    pub fn source_files(
        &self,
        resource_type: ResourceType,
        name: &str,
        target: Option<&FolderConfiguration>,
    ) -> Vec<PathBuf> {
        let state = self.state.lock();
        match target {
            Some(target) => state
                .best_source(resource_type, name, target)
                .map(|s| vec![s.path().to_path_buf()])
                .unwrap_or_default(),
            None => state
                .item_sources(resource_type, name)
                .into_iter()
                .map(|s| s.path().to_path_buf())
                .collect(),
        }
    }

    /// Best-matching file of a file-based resource.
    pub fn matching_file(
        &self,
        name: &str,
        resource_type: ResourceType,
        target: &FolderConfiguration,
    ) -> Option<PathBuf> {
        let state = self.state.lock();
        let candidates: Vec<&Source> = state
            .item_sources(resource_type, name)
            .into_iter()
            .filter(|s| !matches!(s.kind(), SourceKind::MultiValueFile { .. }))
            .collect();
        target
            .find_matching(&candidates)
            .map(|s| s.path().to_path_buf())
    }

    /// Best-matching value of one item, with its source.
    pub fn resolve(
        &self,
        resource_type: ResourceType,
        name: &str,
        target: &FolderConfiguration,
    ) -> Option<ResolvedResource> {
        let state = self.state.lock();
        let source = state.best_source(resource_type, name, target)?;
        TableState::resolved_from(source, resource_type, name, target)
    }

    /// The value one source contributes for (type, name), as
    /// [`resolve`](Self::resolve) would report it for `target`.
    pub fn resolve_source(
        &self,
        id: SourceId,
        resource_type: ResourceType,
        name: &str,
        target: &FolderConfiguration,
    ) -> Option<ResolvedResource> {
        let state = self.state.lock();
        let source = state.sources.get(&id)?;
        TableState::resolved_from(source, resource_type, name, target)
    }

    /// Best-matching value of every item, for every resource type.
    ///
    /// Every member of [`ResourceType::ALL`] has an entry, possibly empty.
    pub fn configured_resources(&self, target: &FolderConfiguration) -> ConfiguredResources {
        let state = self.state.lock();
        let mut out = ConfiguredResources::new();
        for resource_type in ResourceType::ALL {
            let mut resolved = BTreeMap::new();
            if let Some(items) = state.index.items_of(resource_type) {
                for name in items.keys() {
                    let value = state
                        .best_source(resource_type, name, target)
                        .and_then(|s| TableState::resolved_from(s, resource_type, name, target));
                    if let Some(resolved_resource) = value {
                        resolved.insert(name.clone(), resolved_resource.value);
                    }
                }
            }
            out.insert(resource_type, resolved);
        }
        out
    }

    /// Bumped on every mutation.
    pub fn generation(&self) -> u64 {
        self.state.lock().index.generation()
    }

    /// Bumped when the set of declared names changes.
    pub fn id_generation(&self) -> u64 {
        self.state.lock().index.id_generation()
    }

    pub fn source_count(&self) -> usize {
        self.state.lock().sources.len()
    }

    pub fn item_count(&self) -> usize {
        self.state.lock().index.item_count()
    }

    /// Drop items that were created without sources.
    pub fn prune_empty_items(&self) -> usize {
        self.state.lock().index.prune_empty()
    }

    pub fn clear(&self) {
        self.state.lock().clear();
    }
}
