//! Folder configurations and best-match resolution.
//!
//! # Example
//!
//! ```ignore
//! use resrepo::configuration::FolderConfiguration;
//!
//! let candidates = vec![
//!     FolderConfiguration::from_qualifier_string("")?,
//!     FolderConfiguration::from_qualifier_string("fr")?,
//!     FolderConfiguration::from_qualifier_string("fr-rCA")?,
//! ];
//! let target = FolderConfiguration::from_qualifier_string("fr-rCA-hdpi")?;
//! let best = target.find_matching(&candidates);
//! assert_eq!(best.map(|c| c.to_string()).as_deref(), Some("fr-rCA"));
//! ```

mod cache;
mod folder;
mod matching;
pub mod qualifier;

pub use cache::{FolderConfigCache, FolderInfo};
pub use folder::FolderConfiguration;
pub use matching::Configurable;
pub use qualifier::{Density, LocaleQualifier, Qualifier, QualifierKind};
