//! resrepo - configuration-qualified resource repository
//!
//! Indexes a resource tree laid out as `res/<type>[-<qualifiers>]/<file>`
//! and answers "which variant of this resource fits this device
//! configuration?" while the tree is being edited.
//!
//! # Architecture
//!
//! ```text
//!   FsWatcher / editor ──► ChangeEvent ──► ResourceFolderRepository
//!                                              │
//!                               UpdateQueue (one worker, FIFO)
//!                                              │
//!                    parse (MarkupParser) ──► ResourceTable (one mutex)
//!                                              │
//!   queries ◄── best match (FolderConfiguration::find_matching)
//!
//!   persistent cache: read once by open(), rewritten in the background
//!   when more than 5% of the parsable files missed it
//! ```
//!
//! # Example
//!
//! ```ignore
//! use resrepo::{FolderConfiguration, RepositoryConfig, ResourceFolderRepository, ResourceRepository, ResourceType};
//!
//! let repo = ResourceFolderRepository::open("app/src/main/res", RepositoryConfig::default()).await?;
//! let fr = FolderConfiguration::from_qualifier_string("fr")?;
//! if let Some(resolved) = repo.resolve(ResourceType::String, "app_name", &fr) {
//!     println!("{:?} from {}", resolved.value, resolved.path.display());
//! }
//! ```

pub mod cache;
pub mod changes;
pub mod config;
pub mod configuration;
pub mod error;
pub mod folder;
pub mod logging;
pub mod markup;
pub mod pseudolocale;
pub mod repository;
pub mod resource;
pub mod scheduler;
pub mod source;
pub mod watcher;

pub use changes::{ChangeEvent, ChangeSource, ChangeTarget, DocumentChange, FileEvent, FileEventKind};
pub use config::RepositoryConfig;
pub use configuration::{FolderConfiguration, Qualifier, QualifierKind};
pub use error::{CacheError, QualifierError, RepositoryError};
pub use markup::{MarkupParser, QuickXmlParser};
pub use repository::{
    DirectoryRepository, EditDisposition, OverlayRepository, ResourceFolderRepository,
    ResourceRepository, ResourceTable,
};
pub use resource::{ResourceFolderType, ResourceType, ResourceValue};
pub use watcher::FsWatcher;

/// Library version, used as the default cache code version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
