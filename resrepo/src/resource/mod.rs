//! Resource model: types, folder types, values and naming rules.

pub mod naming;
mod types;
mod value;

pub use naming::{file_name_to_resource_name, is_valid_resource_name, ResourceUrl};
pub use types::{ResourceFolderType, ResourceType};
pub use value::{AttrValue, ResourceValue, StyleItem};
