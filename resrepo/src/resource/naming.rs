//! Resource naming rules and resource URLs.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use super::types::ResourceType;

/// Identifier rule applied after `.`, `-` and `:` are mapped to `_`.
static NAME_PATTERN: OnceLock<Regex> = OnceLock::new();

fn name_pattern() -> &'static Regex {
    NAME_PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap())
}

/// Resource name of a file-based resource: the file name up to its first dot.
///
/// ```ignore
/// assert_eq!(file_name_to_resource_name("icon.9.png"), "icon");
/// ```
pub fn file_name_to_resource_name(file_name: &str) -> &str {
    match file_name.find('.') {
        Some(dot) => &file_name[..dot],
        None => file_name,
    }
}

/// Whether `name` is usable as a resource name.
///
/// Value names like `Theme.App.Dark` are legal because dots are flattened to
/// underscores when generating field names.
pub fn is_valid_resource_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let flattened = flatten_resource_name(name);
    name_pattern().is_match(&flattened)
}

/// The field-name form of a resource name (`Theme.App` -> `Theme_App`).
pub fn flatten_resource_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '.' | '-' | ':' => '_',
            other => other,
        })
        .collect()
}

/// A parsed resource reference such as `@string/app_name` or `?colorPrimary`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceUrl {
    pub resource_type: ResourceType,
    pub name: String,
    /// Package prefix, e.g. `android` in `@android:string/ok`.
    pub namespace: Option<String>,
    /// `@+id/...` declaration rather than a reference.
    pub create: bool,
    /// `?...` theme attribute reference.
    pub theme: bool,
}

impl ResourceUrl {
    /// Parse a reference. Returns `None` for `@null`, `@empty` and anything
    /// that is not a reference.
    pub fn parse(url: &str) -> Option<Self> {
        let url = url.trim();
        let (theme, rest) = if let Some(rest) = url.strip_prefix('?') {
            (true, rest)
        } else if let Some(rest) = url.strip_prefix('@') {
            (false, rest)
        } else {
            return None;
        };

        let (create, rest) = match rest.strip_prefix('+') {
            Some(rest) if !theme => (true, rest),
            Some(_) => return None,
            None => (false, rest),
        };

        let (namespace, rest) = match rest.find(':') {
            Some(colon) if !rest[..colon].contains('/') => {
                (Some(rest[..colon].to_string()), &rest[colon + 1..])
            }
            _ => (None, rest),
        };

        let (resource_type, name) = match rest.split_once('/') {
            Some((type_name, name)) => (ResourceType::from_name(type_name)?, name),
            None if theme => (ResourceType::Attr, rest),
            None => return None,
        };

        if name.is_empty() || !is_valid_resource_name(name) {
            return None;
        }

        Some(Self {
            resource_type,
            name: name.to_string(),
            namespace,
            create,
            theme,
        })
    }
}

impl fmt::Display for ResourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.theme { "?" } else { "@" })?;
        if self.create {
            f.write_str("+")?;
        }
        if let Some(ns) = &self.namespace {
            write!(f, "{}:", ns)?;
        }
        write!(f, "{}/{}", self.resource_type, self.name)
    }
}
