//! Values-file interpretation.
//!
//! Only direct children of the `<resources>` root declare resources. Nested
//! elements belong to their declaring parent:
//!
//! | element               | value                                         |
//! |-----------------------|-----------------------------------------------|
//! | `style`               | `parent` attribute plus `<item name>` children |
//! | `declare-styleable`   | names of `<attr>` children, each also emitted as a top-level attr |
//! | `attr`                | `format` list plus `<enum>`/`<flag>` values     |
//! | `array` variants      | text of each `<item>`                           |
//! | `plurals`             | `quantity` -> text of each `<item>`             |
//! | `item type="id"`      | an id                                          |
//! | everything else       | unescaped text content                         |

use std::collections::BTreeMap;

use super::{build_tree, unescape_resource_string, Element, MarkupEvent};
use crate::error::MarkupError;
use crate::resource::{is_valid_resource_name, AttrValue, ResourceType, ResourceValue, StyleItem};

const ANDROID_PREFIX: &str = "android:";

/// One resource declared in a values file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedValue {
    pub resource_type: ResourceType,
    pub name: String,
    pub value: ResourceValue,
    pub line: usize,
    /// `false` when the declaration carries `translatable="false"`.
    pub translatable: bool,
}

/// Result of interpreting a values file: the declared values plus problems
/// that did not prevent the rest of the file from being read.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValuesParse {
    pub values: Vec<ParsedValue>,
    pub errors: Vec<MarkupError>,
}

/// Interpret the events of a values file.
///
/// A structurally broken document yields `Err`; a well-formed document with
/// individually bad declarations yields `Ok` with those declarations listed
/// in [`ValuesParse::errors`].
pub fn parse_values(events: &[MarkupEvent]) -> Result<ValuesParse, MarkupError> {
    let root = build_tree(events)?;
    let mut result = ValuesParse::default();

    if root.name != "resources" {
        result.errors.push(MarkupError::new(
            root.line,
            format!("root element is <{}>, expected <resources>", root.name),
        ));
        return Ok(result);
    }

    for child in root.elements() {
        if matches!(child.name.as_str(), "eat-comment" | "skip") {
            continue;
        }
        let Some(resource_type) = ResourceType::from_xml_tag(&child.name, child.attribute("type"))
        else {
            result.errors.push(MarkupError::new(
                child.line,
                format!("unknown resource element <{}>", child.name),
            ));
            continue;
        };
        let Some(name) = child.attribute("name") else {
            result.errors.push(MarkupError::new(
                child.line,
                format!("<{}> is missing a name", child.name),
            ));
            continue;
        };
        if !is_valid_resource_name(name) {
            result.errors.push(MarkupError::new(
                child.line,
                format!("invalid resource name '{}'", name),
            ));
            continue;
        }

        let value = match resource_type {
            ResourceType::Style => parse_style(child),
            ResourceType::Styleable => parse_styleable(child, &mut result),
            ResourceType::Attr => parse_attr(child),
            ResourceType::Array => ResourceValue::Array {
                elements: child
                    .elements()
                    .filter(|e| e.name == "item")
                    .map(|e| unescape_resource_string(&e.text()))
                    .collect(),
            },
            ResourceType::Plurals => ResourceValue::Plurals {
                quantities: child
                    .elements()
                    .filter(|e| e.name == "item")
                    .filter_map(|e| {
                        e.attribute("quantity")
                            .map(|q| (q.to_string(), unescape_resource_string(&e.text())))
                    })
                    .collect::<BTreeMap<_, _>>(),
            },
            ResourceType::Id => ResourceValue::Id,
            _ => ResourceValue::Text(unescape_resource_string(&child.text())),
        };

        result.values.push(ParsedValue {
            resource_type,
            name: name.to_string(),
            value,
            line: child.line,
            translatable: child.attribute("translatable") != Some("false"),
        });
    }

    Ok(result)
}

fn parse_style(element: &Element) -> ResourceValue {
    let items = element
        .elements()
        .filter(|e| e.name == "item")
        .filter_map(|e| {
            let name = e.attribute("name").filter(|n| !n.is_empty())?;
            Some(StyleItem {
                name: name.to_string(),
                value: e.text().trim().to_string(),
            })
        })
        .collect();
    ResourceValue::Style {
        parent: element.attribute("parent").map(str::to_string),
        items,
    }
}

fn parse_styleable(element: &Element, result: &mut ValuesParse) -> ResourceValue {
    let mut attrs = Vec::new();
    for attr in element.elements().filter(|e| e.name == "attr") {
        let Some(name) = attr.attribute("name").filter(|n| !n.is_empty()) else {
            continue;
        };
        attrs.push(name.to_string());

        // Framework attrs are only referenced here, not declared.
        if name.starts_with(ANDROID_PREFIX) || !is_valid_resource_name(name) {
            continue;
        }
        result.values.push(ParsedValue {
            resource_type: ResourceType::Attr,
            name: name.to_string(),
            value: parse_attr(attr),
            line: attr.line,
            translatable: true,
        });
    }
    ResourceValue::Styleable { attrs }
}

fn parse_attr(element: &Element) -> ResourceValue {
    let formats = element
        .attribute("format")
        .map(|f| {
            f.split('|')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let values = element
        .elements()
        .filter(|e| e.name == "enum" || e.name == "flag")
        .filter_map(|e| {
            let name = e.attribute("name")?;
            let value = decode_integer(e.attribute("value")?)?;
            Some(AttrValue {
                name: name.to_string(),
                value,
            })
        })
        .collect();
    ResourceValue::Attr { formats, values }
}

/// Decode a decimal, `0x` hexadecimal or leading-zero octal integer, with an
/// optional sign. Hex values above `i32::MAX` are accepted.
pub fn decode_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .or_else(|| digits.strip_prefix('#'))
    {
        i64::from_str_radix(hex, 16).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}
