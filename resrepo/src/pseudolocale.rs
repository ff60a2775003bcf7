//! Pseudolocale generation.
//!
//! Two reserved locales exercise a UI without real translations:
//!
//! | Locale   | Method | `Test String` becomes                  |
//! |----------|--------|----------------------------------------|
//! | `en-rXA` | accent | `[Ţéšţ Šţŕîñĝ one two]`                |
//! | `ar-rXB` | bidi   | each word wrapped in RLM+RLO ... PDF+RLM |
//!
//! Only strings, plurals and arrays from sources without a locale are
//! rewritten, and never when the declaration is `translatable="false"` or
//! the file name contains `donottranslate`. A real `values-en-rXA` variant
//! always takes precedence, because best-match picks it over the
//! unlocalized source.

use std::path::Path;

use crate::configuration::{FolderConfiguration, LocaleQualifier, Qualifier};
use crate::resource::{ResourceType, ResourceValue};

/// Files whose name contains this are never pseudolocalized.
pub const DO_NOT_TRANSLATE: &str = "donottranslate";

const EXPANSION: &str = "one two three four five six seven eight nine ten eleven twelve \
thirteen fourteen fifteen sixteen seventeen eighteen nineteen twenty";

const BIDI_WORD_START: &str = "\u{200f}\u{202e}";
const BIDI_WORD_END: &str = "\u{202c}\u{200f}";

/// How text is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoMethod {
    /// Accented letters, wrapped in brackets and padded with words.
    Accent,
    /// Every word forced right-to-left.
    Bidi,
}

impl PseudoMethod {
    /// The method for a target configuration, if its locale is a
    /// pseudolocale.
    pub fn for_configuration(target: &FolderConfiguration) -> Option<Self> {
        match (target.language(), target.region()) {
            (Some("en"), Some("XA")) => Some(PseudoMethod::Accent),
            (Some("ar"), Some("XB")) => Some(PseudoMethod::Bidi),
            _ => None,
        }
    }

    /// The locale the method stands for.
    pub fn locale(self) -> LocaleQualifier {
        match self {
            PseudoMethod::Accent => LocaleQualifier::new("en").with_region("XA"),
            PseudoMethod::Bidi => LocaleQualifier::new("ar").with_region("XB"),
        }
    }

    /// Rewrite one text. Blank text is returned unchanged.
    pub fn apply(self, text: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }
        match self {
            PseudoMethod::Accent => accent(text),
            PseudoMethod::Bidi => bidi(text),
        }
    }

    /// Rewrite a string, plurals or array value. Other types and value
    /// shapes yield `None`.
    pub fn apply_value(self, resource_type: ResourceType, value: &ResourceValue) -> Option<ResourceValue> {
        match (resource_type, value) {
            (ResourceType::String, ResourceValue::Text(text)) => {
                Some(ResourceValue::Text(self.apply(text)))
            }
            (ResourceType::Plurals, ResourceValue::Plurals { quantities }) => {
                Some(ResourceValue::Plurals {
                    quantities: quantities
                        .iter()
                        .map(|(quantity, text)| (quantity.clone(), self.apply(text)))
                        .collect(),
                })
            }
            (ResourceType::Array, ResourceValue::Array { elements }) => Some(ResourceValue::Array {
                elements: elements.iter().map(|e| self.apply(e)).collect(),
            }),
            _ => None,
        }
    }
}

/// Whether a value from `path` with `configuration` may be rewritten.
pub fn is_pseudolocalizable(configuration: &FolderConfiguration, path: &Path, translatable: bool) -> bool {
    translatable
        && configuration.language().is_none()
        && !path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains(DO_NOT_TRANSLATE))
}

/// `source` with its locale replaced by the method's locale.
pub fn pseudolocale_configuration(source: &FolderConfiguration, method: PseudoMethod) -> FolderConfiguration {
    source.clone().with(Qualifier::Locale(method.locale()))
}

fn accent_char(c: char) -> Option<char> {
    let accented = match c {
        'a' => 'å',
        'b' => 'ɓ',
        'c' => 'ç',
        'd' => 'ð',
        'e' => 'é',
        'f' => 'ƒ',
        'g' => 'ĝ',
        'h' => 'ĥ',
        'i' => 'î',
        'j' => 'ĵ',
        'k' => 'ķ',
        'l' => 'ļ',
        'm' => 'ḿ',
        'n' => 'ñ',
        'o' => 'ö',
        'p' => 'þ',
        'q' => 'Q',
        'r' => 'ŕ',
        's' => 'š',
        't' => 'ţ',
        'u' => 'û',
        'v' => 'V',
        'w' => 'ŵ',
        'x' => 'х',
        'y' => 'ý',
        'z' => 'ž',
        'A' => 'Å',
        'B' => 'β',
        'C' => 'Ç',
        'D' => 'Ð',
        'E' => 'É',
        'G' => 'Ĝ',
        'H' => 'Ĥ',
        'I' => 'Î',
        'J' => 'Ĵ',
        'K' => 'Ķ',
        'L' => 'Ļ',
        'M' => 'Ḿ',
        'N' => 'Ñ',
        'O' => 'Ö',
        'P' => 'Þ',
        'Q' => 'q',
        'R' => 'Ŕ',
        'S' => 'Š',
        'T' => 'Ţ',
        'U' => 'Û',
        'V' => 'ν',
        'W' => 'Ŵ',
        'X' => '×',
        'Y' => 'Ý',
        'Z' => 'Ž',
        '!' => '¡',
        '?' => '¿',
        '$' => '€',
        _ => return None,
    };
    Some(accented)
}

/// Last character of a `%` format placeholder.
fn ends_placeholder(c: char) -> bool {
    matches!(
        c,
        's' | 'S' | 'c' | 'C' | 'd' | 'o' | 'x' | 'X' | 'f' | 'e' | 'E' | 'g' | 'G' | 'a' | 'A'
            | 'b' | 'B' | 'h' | 'H' | '%' | 'n'
    )
}

fn accent(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2 + 16);
    out.push('[');

    // Placeholders do not count towards the length; words count only when
    // they start with a letter that has no accented form.
    let mut length = 0usize;
    let mut words = 0usize;
    let mut last_space = true;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '%' {
            out.push(c);
            while let Some(next) = chars.next() {
                out.push(next);
                if ends_placeholder(next) {
                    break;
                }
                if next == 't' {
                    if let Some(unit) = chars.next() {
                        out.push(unit);
                    }
                    break;
                }
            }
            continue;
        }
        match accent_char(c) {
            Some(accented) => out.push(accented),
            None => {
                let space = c.is_whitespace();
                if last_space && !space {
                    words += 1;
                }
                last_space = space;
                out.push(c);
            }
        }
        length += 1;
    }

    if length > 0 {
        out.push(' ');
        out.push_str(&expansion(if words > 1 { length } else { length / 2 }));
    }
    out.push(']');
    out
}

/// Whole words of [`EXPANSION`] covering at least `length` characters.
fn expansion(length: usize) -> String {
    let mut result = EXPANSION.to_string();
    if result.len() < length {
        result.push(' ');
        let rest = length.saturating_sub(result.len());
        result.push_str(&expansion(rest));
    } else {
        let bytes = result.as_bytes();
        let mut end = length;
        for &b in bytes.iter().skip(length + 1) {
            end += 1;
            if b == b' ' {
                break;
            }
        }
        result.truncate(end.min(bytes.len()));
    }
    result
}

fn bidi(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut last_space = true;
    for c in text.chars() {
        let space = c.is_whitespace();
        if last_space && !space {
            out.push_str(BIDI_WORD_START);
        } else if !last_space && space {
            out.push_str(BIDI_WORD_END);
        }
        last_space = space;
        out.push(c);
    }
    if !last_space {
        out.push_str(BIDI_WORD_END);
    }
    out
}
