//! Resource repositories.
//!
//! Two strategies share one [`ResourceTable`] and the same query contract:
//!
//! | Repository                  | Loading                          | Updates                          |
//! |-----------------------------|----------------------------------|----------------------------------|
//! | [`DirectoryRepository`]     | lazy full scan on first query    | explicit `process_*` calls       |
//! | [`ResourceFolderRepository`]| persistent cache + live parse    | FIFO update queue, in-place edits|
//!
//! Both implement [`ResourceRepository`], whose provided methods cover every
//! read a consumer needs. [`OverlayRepository`] stacks several of them, one
//! per root, and runs the same queries across all layers.

mod directory;
mod incremental;
pub(crate) mod loader;
mod overlay;
pub mod table;

pub use directory::DirectoryRepository;
pub use incremental::{EditDisposition, RepositoryStats, ResourceFolderRepository};
pub use overlay::OverlayRepository;
pub use table::{
    CommitResult, ConfiguredResources, ItemView, ResolvedResource, ResourceTable, SourceRef,
};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::configuration::FolderConfiguration;
use crate::resource::ResourceType;

/// Read access shared by every repository.
pub trait ResourceRepository: Send + Sync {
    /// The backing table. Lazy repositories load before returning it.
    fn table(&self) -> &ResourceTable;

    /// The resource root.
    fn root(&self) -> &Path;

    fn items_of_type(&self, resource_type: ResourceType) -> Arc<[ItemView]> {
        self.table().items_of_type(resource_type)
    }

    fn has_resource_item(&self, resource_type: ResourceType, name: &str) -> bool {
        self.table().has_resource_item(resource_type, name)
    }

    fn has_resource_url(&self, url: &str) -> bool {
        self.table().has_resource_url(url)
    }

    fn has_resources_of_type(&self, resource_type: ResourceType) -> bool {
        self.table().has_resources_of_type(resource_type)
    }

    fn available_types(&self) -> Vec<ResourceType> {
        self.table().available_types()
    }

    fn languages(&self) -> BTreeSet<String> {
        self.table().languages()
    }

    fn regions(&self, language: &str) -> BTreeSet<String> {
        self.table().regions(language)
    }

    fn source_files(
        &self,
        resource_type: ResourceType,
        name: &str,
        target: Option<&FolderConfiguration>,
    ) -> Vec<PathBuf> {
        self.table().source_files(resource_type, name, target)
    }

    fn matching_file(
        &self,
        name: &str,
        resource_type: ResourceType,
        target: &FolderConfiguration,
    ) -> Option<PathBuf> {
        self.table().matching_file(name, resource_type, target)
    }

    fn resolve(
        &self,
        resource_type: ResourceType,
        name: &str,
        target: &FolderConfiguration,
    ) -> Option<ResolvedResource> {
        self.table().resolve(resource_type, name, target)
    }

    fn configured_resources(&self, target: &FolderConfiguration) -> ConfiguredResources {
        self.table().configured_resources(target)
    }

    fn generation(&self) -> u64 {
        self.table().generation()
    }

    fn id_generation(&self) -> u64 {
        self.table().id_generation()
    }
}
