//! Resolved resource values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One `<item name="...">` of a style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleItem {
    pub name: String,
    pub value: String,
}

/// One `<enum>` or `<flag>` child of an attr declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrValue {
    pub name: String,
    pub value: i64,
}

/// The value a source contributes for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceValue {
    /// Text of a simple value (string, color, dimen, bool, integer, ...).
    Text(String),
    /// A file-based resource, with the density of its folder if any.
    File { path: PathBuf, density: Option<u32> },
    Style {
        parent: Option<String>,
        items: Vec<StyleItem>,
    },
    Styleable { attrs: Vec<String> },
    Attr {
        formats: Vec<String>,
        values: Vec<AttrValue>,
    },
    Array { elements: Vec<String> },
    Plurals { quantities: BTreeMap<String, String> },
    Id,
}

impl ResourceValue {
    /// Text of a simple value, or `None` for structured values.
    pub fn text(&self) -> Option<&str> {
        match self {
            ResourceValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// File path of a file-based value.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ResourceValue::File { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Whether an edit to the element's text can be applied in place.
    ///
    /// Only plain text values qualify; structured values carry children whose
    /// text alone does not determine the value.
    pub fn is_text_editable(&self) -> bool {
        matches!(self, ResourceValue::Text(_))
    }
}
