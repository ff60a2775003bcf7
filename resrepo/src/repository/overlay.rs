//! Several resource roots queried as one.
//!
//! A module's resources usually come from more than one root: the main
//! source set, build-type and flavor overlays, generated resources. Each
//! root keeps its own repository; [`OverlayRepository`] answers queries
//! across all of them:
//!
//! ```text
//! layers:  [ main/res , debug/res , generated/res ]
//!            lowest ───────────────────► highest precedence
//!
//! resolve(string/app_name, fr-rCA)
//!   candidates = sources of every layer, highest layer first
//!   best match over all candidates; equal configurations keep the
//!   highest layer
//! ```
//!
//! A layer only wins by precedence when it offers an equally good
//! configuration: a `values-fr` in `main` still beats a plain `values` in
//! `debug` for a French device.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::table::{ConfiguredResources, ItemView, ResolvedResource, SourceRef};
use super::ResourceRepository;
use crate::configuration::{Configurable, FolderConfiguration};
use crate::resource::{ResourceType, ResourceUrl};

/// A source together with the layer it came from.
#[derive(Debug, Clone)]
struct Candidate {
    layer: usize,
    source: SourceRef,
}

impl Configurable for Candidate {
    fn configuration(&self) -> &FolderConfiguration {
        &self.source.configuration
    }
}

/// Repositories over several roots, later layers overriding earlier ones.
#[derive(Clone, Default)]
pub struct OverlayRepository {
    layers: Vec<Arc<dyn ResourceRepository>>,
}

impl OverlayRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layers in overlay order: the last one has the highest precedence.
    pub fn from_layers(layers: Vec<Arc<dyn ResourceRepository>>) -> Self {
        Self { layers }
    }

    /// Add a layer above every existing one.
    pub fn push_overlay(&mut self, layer: Arc<dyn ResourceRepository>) {
        tracing::debug!(root = %layer.root().display(), layer = self.layers.len(), "Added resource overlay");
        self.layers.push(layer);
    }

    pub fn layers(&self) -> &[Arc<dyn ResourceRepository>] {
        &self.layers
    }

    /// Roots in overlay order.
    pub fn roots(&self) -> Vec<&Path> {
        self.layers.iter().map(|l| l.root()).collect()
    }

    /// Sources of one item across layers, highest layer first.
    fn candidates(&self, resource_type: ResourceType, name: &str) -> Vec<Candidate> {
        let mut out = Vec::new();
        for (layer, repo) in self.layers.iter().enumerate().rev() {
            let items = repo.items_of_type(resource_type);
            if let Ok(i) = items.binary_search_by(|item| item.name.as_str().cmp(name)) {
                out.extend(items[i].sources.iter().cloned().map(|source| Candidate { layer, source }));
            }
        }
        out
    }

    /// Best-matching value of one item across every layer.
    pub fn resolve(
        &self,
        resource_type: ResourceType,
        name: &str,
        target: &FolderConfiguration,
    ) -> Option<ResolvedResource> {
        let candidates = self.candidates(resource_type, name);
        let best = target.find_matching(&candidates)?;
        self.layers[best.layer]
            .table()
            .resolve_source(best.source.id, resource_type, name, target)
    }

    /// Best-matching file of a file-based resource across every layer.
    pub fn matching_file(
        &self,
        name: &str,
        resource_type: ResourceType,
        target: &FolderConfiguration,
    ) -> Option<PathBuf> {
        let candidates: Vec<Candidate> = self
            .candidates(resource_type, name)
            .into_iter()
            .filter(|c| c.source.file)
            .collect();
        target
            .find_matching(&candidates)
            .map(|c| c.source.path.clone())
    }

    /// Files backing an item: all of them in precedence order, or only the
    /// best match for `target`.
    pub fn source_files(
        &self,
        resource_type: ResourceType,
        name: &str,
        target: Option<&FolderConfiguration>,
    ) -> Vec<PathBuf> {
        let candidates = self.candidates(resource_type, name);
        match target {
            Some(target) => target
                .find_matching(&candidates)
                .map(|c| vec![c.source.path.clone()])
                .unwrap_or_default(),
            None => candidates.into_iter().map(|c| c.source.path).collect(),
        }
    }

    /// Every item of a type, merged across layers and sorted by name. Each
    /// item lists its sources highest layer first.
    pub fn items_of_type(&self, resource_type: ResourceType) -> Vec<ItemView> {
        let mut merged: BTreeMap<String, Vec<SourceRef>> = BTreeMap::new();
        for repo in self.layers.iter().rev() {
            for item in repo.items_of_type(resource_type).iter() {
                merged
                    .entry(item.name.clone())
                    .or_default()
                    .extend(item.sources.iter().cloned());
            }
        }
        merged
            .into_iter()
            .map(|(name, sources)| ItemView {
                resource_type,
                name,
                sources,
            })
            .collect()
    }

    pub fn has_resource_item(&self, resource_type: ResourceType, name: &str) -> bool {
        self.layers
            .iter()
            .any(|repo| repo.has_resource_item(resource_type, name))
    }

    /// Whether a local reference such as `@string/app_name` names an item
    /// of any layer.
    pub fn has_resource_url(&self, url: &str) -> bool {
        match ResourceUrl::parse(url) {
            Some(url) if url.namespace.is_none() => {
                self.has_resource_item(url.resource_type, &url.name)
            }
            _ => false,
        }
    }

    pub fn has_resources_of_type(&self, resource_type: ResourceType) -> bool {
        self.layers
            .iter()
            .any(|repo| repo.has_resources_of_type(resource_type))
    }

    pub fn available_types(&self) -> Vec<ResourceType> {
        ResourceType::ALL
            .into_iter()
            .filter(|t| self.has_resources_of_type(*t))
            .collect()
    }

    pub fn languages(&self) -> BTreeSet<String> {
        self.layers.iter().flat_map(|repo| repo.languages()).collect()
    }

    pub fn regions(&self, language: &str) -> BTreeSet<String> {
        self.layers
            .iter()
            .flat_map(|repo| repo.regions(language))
            .collect()
    }

    /// Best-matching value of every item across layers, for every type.
    pub fn configured_resources(&self, target: &FolderConfiguration) -> ConfiguredResources {
        let mut out = ConfiguredResources::new();
        for resource_type in ResourceType::ALL {
            let mut names = BTreeSet::new();
            for repo in &self.layers {
                names.extend(repo.items_of_type(resource_type).iter().map(|i| i.name.clone()));
            }
            let resolved = names
                .into_iter()
                .filter_map(|name| {
                    let value = self.resolve(resource_type, &name, target)?.value;
                    Some((name, value))
                })
                .collect();
            out.insert(resource_type, resolved);
        }
        out
    }

    /// Sum of the layers' generations; changes whenever any layer changes.
    pub fn generation(&self) -> u64 {
        self.layers.iter().map(|repo| repo.generation()).sum()
    }
}
