//! Android string value unescaping.
//!
//! Rules applied to the raw element text:
//! - unescaped double quotes delimit literal sections and are removed;
//! - outside quotes, runs of whitespace collapse to one space and leading or
//!   trailing whitespace is dropped;
//! - `\n` and `\t` become newline and tab, `\uXXXX` a code point, and any
//!   other escaped character (`\' \" \\ \@ \?`) stands for itself.

/// Unescape the text of a string-like resource value.
pub fn unescape_resource_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut in_quotes = false;
    let mut pending_space = false;

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
            }
            '\\' => {
                if pending_space {
                    out.push(' ');
                    pending_space = false;
                }
                match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('u') => {
                        let hex: String = chars.by_ref().take(4).collect();
                        match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                            Some(decoded) if hex.len() == 4 => out.push(decoded),
                            _ => {
                                out.push_str("\\u");
                                out.push_str(&hex);
                            }
                        }
                    }
                    Some(other) => out.push(other),
                    None => out.push('\\'),
                }
            }
            c if c.is_whitespace() && !in_quotes => {
                if !out.is_empty() {
                    pending_space = true;
                }
            }
            c => {
                if pending_space {
                    out.push(' ');
                    pending_space = false;
                }
                out.push(c);
            }
        }
    }

    out
}
