//! Markup parsing for resource files.
//!
//! The repository never reads XML itself. It asks a [`MarkupParser`] for a
//! flat list of [`MarkupEvent`]s and interprets those:
//!
//! ```text
//! file text ──► MarkupParser::parse ──► Vec<MarkupEvent>
//!                                           │
//!                    ┌──────────────────────┴───────────────┐
//!                    ▼                                      ▼
//!        values::parse_values (values/)        ids::collect_ids (layout/, menu/, ...)
//! ```
//!
//! [`QuickXmlParser`] is the default implementation. Tests substitute their
//! own parsers to observe or delay parsing.

pub mod escape;
pub mod ids;
pub mod values;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::MarkupError;

pub use escape::unescape_resource_string;

/// One event of a parsed markup document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupEvent {
    Start {
        name: String,
        attributes: Vec<(String, String)>,
        /// 1-based line of the start tag.
        line: usize,
    },
    End {
        name: String,
    },
    Text {
        text: String,
    },
}

impl MarkupEvent {
    /// Attribute value of a start event.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        match self {
            MarkupEvent::Start { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

/// Turns markup text into events.
///
/// Implementations must be usable from any thread: parsing runs on the
/// update worker and, during initial load, on the rayon pool.
pub trait MarkupParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<Vec<MarkupEvent>, MarkupError>;
}

/// [`MarkupParser`] on top of `quick-xml`.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuickXmlParser;

impl QuickXmlParser {
    pub fn new() -> Self {
        Self
    }

    fn start_event(e: &BytesStart<'_>, line: usize) -> Result<MarkupEvent, MarkupError> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| MarkupError::new(line, err.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| MarkupError::new(line, err.to_string()))?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(MarkupEvent::Start {
            name,
            attributes,
            line,
        })
    }
}

impl MarkupParser for QuickXmlParser {
    fn parse(&self, text: &str) -> Result<Vec<MarkupEvent>, MarkupError> {
        let mut reader = Reader::from_str(text);
        let mut events = Vec::new();
        let mut depth = 0usize;
        let mut seen_root = false;
        let mut lines = LineCounter::new(text);

        loop {
            let line = lines.line_at(reader.buffer_position() as usize);
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    if depth == 0 && seen_root {
                        return Err(MarkupError::new(line, "multiple root elements"));
                    }
                    seen_root = true;
                    depth += 1;
                    events.push(Self::start_event(&e, line)?);
                }
                Ok(Event::Empty(e)) => {
                    if depth == 0 && seen_root {
                        return Err(MarkupError::new(line, "multiple root elements"));
                    }
                    seen_root = true;
                    let start = Self::start_event(&e, line)?;
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    events.push(start);
                    events.push(MarkupEvent::End { name });
                }
                Ok(Event::End(e)) => {
                    depth = depth.saturating_sub(1);
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    events.push(MarkupEvent::End { name });
                }
                Ok(Event::Text(t)) => {
                    let text = t
                        .unescape()
                        .map_err(|err| MarkupError::new(line, err.to_string()))?
                        .into_owned();
                    if depth > 0 {
                        events.push(MarkupEvent::Text { text });
                    }
                }
                Ok(Event::CData(c)) => {
                    if depth > 0 {
                        let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                        events.push(MarkupEvent::Text { text });
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => {
                    let line = lines.line_at(reader.buffer_position() as usize);
                    return Err(MarkupError::new(line, err.to_string()));
                }
            }
        }

        if depth != 0 {
            return Err(MarkupError::new(
                lines.line_at(text.len()),
                "unexpected end of document",
            ));
        }
        if !seen_root {
            return Err(MarkupError::new(1, "document has no root element"));
        }
        Ok(events)
    }
}

/// 1-based line numbers for byte offsets of one text.
///
/// The reader only moves forward, so each lookup counts newlines since the
/// previous one. A lookup behind the last offset starts over from the top.
struct LineCounter<'a> {
    bytes: &'a [u8],
    offset: usize,
    line: usize,
}

impl<'a> LineCounter<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            offset: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, offset: usize) -> usize {
        let end = offset.min(self.bytes.len());
        if end < self.offset {
            self.offset = 0;
            self.line = 1;
        }
        self.line += self.bytes[self.offset..end]
            .iter()
            .filter(|b| **b == b'\n')
            .count();
        self.offset = end;
        self.line
    }
}

// =============================================================================
// Element tree
// =============================================================================

/// A node of an element tree built from events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element with its attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub line: usize,
    pub children: Vec<Node>,
}

impl Element {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Concatenated text of all descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }
}

/// Build the root element from a balanced event list.
pub fn build_tree(events: &[MarkupEvent]) -> Result<Element, MarkupError> {
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    for event in events {
        match event {
            MarkupEvent::Start {
                name,
                attributes,
                line,
            } => {
                if root.is_some() {
                    return Err(MarkupError::new(*line, "content after root element"));
                }
                stack.push(Element {
                    name: name.clone(),
                    attributes: attributes.clone(),
                    line: *line,
                    children: Vec::new(),
                });
            }
            MarkupEvent::End { name } => {
                let element = stack
                    .pop()
                    .ok_or_else(|| MarkupError::new(0, format!("unbalanced </{}>", name)))?;
                if &element.name != name {
                    return Err(MarkupError::new(
                        element.line,
                        format!("<{}> closed by </{}>", element.name, name),
                    ));
                }
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Element(element)),
                    None => root = Some(element),
                }
            }
            MarkupEvent::Text { text } => {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(text.clone()));
                }
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(MarkupError::new(open.line, format!("<{}> is never closed", open.name)));
    }
    root.ok_or_else(|| MarkupError::new(1, "document has no root element"))
}
