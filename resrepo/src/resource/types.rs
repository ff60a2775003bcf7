//! Resource types and resource folder types.
//!
//! A [`ResourceType`] is the kind of a named resource (`string`, `layout`,
//! `id`, ...). A [`ResourceFolderType`] is the base name of a directory under
//! the resource root (`values`, `layout`, `drawable`, ...), before any
//! qualifiers. The relationship between the two is fixed:
//!
//! ```text
//! values/       -> every value type (string, color, style, attr, id, ...)
//! layout/       -> layout + id (from @+id declarations)
//! drawable/     -> drawable + id (xml drawables may declare ids)
//! raw/          -> raw
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a named resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    Anim,
    Animator,
    Array,
    Attr,
    Bool,
    Color,
    Dimen,
    Drawable,
    Font,
    Fraction,
    Id,
    Integer,
    Interpolator,
    Layout,
    Menu,
    Mipmap,
    Plurals,
    Raw,
    String,
    Style,
    Styleable,
    Transition,
    Xml,
}

impl ResourceType {
    /// Every resource type, in declaration order.
    pub const ALL: [ResourceType; 23] = [
        ResourceType::Anim,
        ResourceType::Animator,
        ResourceType::Array,
        ResourceType::Attr,
        ResourceType::Bool,
        ResourceType::Color,
        ResourceType::Dimen,
        ResourceType::Drawable,
        ResourceType::Font,
        ResourceType::Fraction,
        ResourceType::Id,
        ResourceType::Integer,
        ResourceType::Interpolator,
        ResourceType::Layout,
        ResourceType::Menu,
        ResourceType::Mipmap,
        ResourceType::Plurals,
        ResourceType::Raw,
        ResourceType::String,
        ResourceType::Style,
        ResourceType::Styleable,
        ResourceType::Transition,
        ResourceType::Xml,
    ];

    /// The name used in resource URLs and `type="..."` attributes.
    pub fn name(self) -> &'static str {
        match self {
            ResourceType::Anim => "anim",
            ResourceType::Animator => "animator",
            ResourceType::Array => "array",
            ResourceType::Attr => "attr",
            ResourceType::Bool => "bool",
            ResourceType::Color => "color",
            ResourceType::Dimen => "dimen",
            ResourceType::Drawable => "drawable",
            ResourceType::Font => "font",
            ResourceType::Fraction => "fraction",
            ResourceType::Id => "id",
            ResourceType::Integer => "integer",
            ResourceType::Interpolator => "interpolator",
            ResourceType::Layout => "layout",
            ResourceType::Menu => "menu",
            ResourceType::Mipmap => "mipmap",
            ResourceType::Plurals => "plurals",
            ResourceType::Raw => "raw",
            ResourceType::String => "string",
            ResourceType::Style => "style",
            ResourceType::Styleable => "styleable",
            ResourceType::Transition => "transition",
            ResourceType::Xml => "xml",
        }
    }

    /// Look up a type by its URL name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Map an element of a values file to the type it declares.
    ///
    /// `type_attr` is the value of the element's `type` attribute, which only
    /// matters for `<item>`. Returns `None` for elements that declare nothing
    /// (`eat-comment`, `skip`, unknown tags).
    pub fn from_xml_tag(tag: &str, type_attr: Option<&str>) -> Option<Self> {
        match tag {
            "string" => Some(ResourceType::String),
            "color" => Some(ResourceType::Color),
            "dimen" => Some(ResourceType::Dimen),
            "bool" => Some(ResourceType::Bool),
            "integer" => Some(ResourceType::Integer),
            "fraction" => Some(ResourceType::Fraction),
            "style" => Some(ResourceType::Style),
            "attr" => Some(ResourceType::Attr),
            "plurals" => Some(ResourceType::Plurals),
            "array" | "string-array" | "integer-array" => Some(ResourceType::Array),
            "declare-styleable" => Some(ResourceType::Styleable),
            "drawable" => Some(ResourceType::Drawable),
            "item" => type_attr.and_then(Self::from_name),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The base name of a resource directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceFolderType {
    Anim,
    Animator,
    Color,
    Drawable,
    Font,
    Interpolator,
    Layout,
    Menu,
    Mipmap,
    Raw,
    Transition,
    Values,
    Xml,
}

/// Types a values folder can produce.
const VALUE_TYPES: &[ResourceType] = &[
    ResourceType::String,
    ResourceType::Array,
    ResourceType::Attr,
    ResourceType::Bool,
    ResourceType::Color,
    ResourceType::Dimen,
    ResourceType::Drawable,
    ResourceType::Fraction,
    ResourceType::Id,
    ResourceType::Integer,
    ResourceType::Plurals,
    ResourceType::Style,
    ResourceType::Styleable,
];

impl ResourceFolderType {
    pub const ALL: [ResourceFolderType; 13] = [
        ResourceFolderType::Anim,
        ResourceFolderType::Animator,
        ResourceFolderType::Color,
        ResourceFolderType::Drawable,
        ResourceFolderType::Font,
        ResourceFolderType::Interpolator,
        ResourceFolderType::Layout,
        ResourceFolderType::Menu,
        ResourceFolderType::Mipmap,
        ResourceFolderType::Raw,
        ResourceFolderType::Transition,
        ResourceFolderType::Values,
        ResourceFolderType::Xml,
    ];

    /// Directory base name.
    pub fn name(self) -> &'static str {
        match self {
            ResourceFolderType::Anim => "anim",
            ResourceFolderType::Animator => "animator",
            ResourceFolderType::Color => "color",
            ResourceFolderType::Drawable => "drawable",
            ResourceFolderType::Font => "font",
            ResourceFolderType::Interpolator => "interpolator",
            ResourceFolderType::Layout => "layout",
            ResourceFolderType::Menu => "menu",
            ResourceFolderType::Mipmap => "mipmap",
            ResourceFolderType::Raw => "raw",
            ResourceFolderType::Transition => "transition",
            ResourceFolderType::Values => "values",
            ResourceFolderType::Xml => "xml",
        }
    }

    /// Look up a folder type by exact base name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Folder type of a full directory name such as `values-fr-rCA`.
    pub fn from_folder_name(folder_name: &str) -> Option<Self> {
        let base = folder_name.split('-').next().unwrap_or(folder_name);
        Self::from_name(base)
    }

    /// Resource types files in this folder can produce.
    ///
    /// For file-based folders the first entry is the type of the file itself.
    pub fn related_types(self) -> &'static [ResourceType] {
        match self {
            ResourceFolderType::Values => VALUE_TYPES,
            ResourceFolderType::Anim => &[ResourceType::Anim],
            ResourceFolderType::Animator => &[ResourceType::Animator],
            ResourceFolderType::Color => &[ResourceType::Color],
            ResourceFolderType::Drawable => &[ResourceType::Drawable, ResourceType::Id],
            ResourceFolderType::Font => &[ResourceType::Font],
            ResourceFolderType::Interpolator => &[ResourceType::Interpolator],
            ResourceFolderType::Layout => &[ResourceType::Layout, ResourceType::Id],
            ResourceFolderType::Menu => &[ResourceType::Menu, ResourceType::Id],
            ResourceFolderType::Mipmap => &[ResourceType::Mipmap],
            ResourceFolderType::Raw => &[ResourceType::Raw],
            ResourceFolderType::Transition => &[ResourceType::Transition, ResourceType::Id],
            ResourceFolderType::Xml => &[ResourceType::Xml, ResourceType::Id],
        }
    }

    /// The type of a file-based resource in this folder.
    ///
    /// `None` for `values`, whose files declare many resources each.
    pub fn file_resource_type(self) -> Option<ResourceType> {
        match self {
            ResourceFolderType::Values => None,
            other => other.related_types().first().copied(),
        }
    }

    /// Whether XML files in this folder may declare `@+id/` identifiers.
    pub fn is_id_generating(self) -> bool {
        matches!(
            self,
            ResourceFolderType::Layout
                | ResourceFolderType::Menu
                | ResourceFolderType::Drawable
                | ResourceFolderType::Xml
                | ResourceFolderType::Transition
        )
    }
}

impl fmt::Display for ResourceFolderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_name_roundtrip() {
        for t in ResourceType::ALL {
            assert_eq!(ResourceType::from_name(t.name()), Some(t));
        }
        assert_eq!(ResourceType::from_name("bogus"), None);
    }

    #[test]
    fn test_from_xml_tag() {
        assert_eq!(ResourceType::from_xml_tag("string", None), Some(ResourceType::String));
        assert_eq!(ResourceType::from_xml_tag("string-array", None), Some(ResourceType::Array));
        assert_eq!(
            ResourceType::from_xml_tag("declare-styleable", None),
            Some(ResourceType::Styleable)
        );
        assert_eq!(ResourceType::from_xml_tag("item", Some("id")), Some(ResourceType::Id));
        assert_eq!(ResourceType::from_xml_tag("item", None), None);
        assert_eq!(ResourceType::from_xml_tag("eat-comment", None), None);
    }

    #[test]
    fn test_folder_type_from_folder_name() {
        assert_eq!(
            ResourceFolderType::from_folder_name("values-fr-rCA"),
            Some(ResourceFolderType::Values)
        );
        assert_eq!(
            ResourceFolderType::from_folder_name("drawable"),
            Some(ResourceFolderType::Drawable)
        );
        assert_eq!(ResourceFolderType::from_folder_name("assets"), None);
    }

    #[test]
    fn test_related_types() {
        assert_eq!(
            ResourceFolderType::Layout.related_types(),
            &[ResourceType::Layout, ResourceType::Id]
        );
        assert!(ResourceFolderType::Values.related_types().contains(&ResourceType::String));
        assert_eq!(ResourceFolderType::Values.file_resource_type(), None);
        assert_eq!(ResourceFolderType::Raw.file_resource_type(), Some(ResourceType::Raw));
    }

    #[test]
    fn test_id_generating_folders() {
        assert!(ResourceFolderType::Layout.is_id_generating());
        assert!(ResourceFolderType::Menu.is_id_generating());
        assert!(!ResourceFolderType::Values.is_id_generating());
        assert!(!ResourceFolderType::Raw.is_id_generating());
    }
}
