/*!
 * The XML event vocabulary shared by every pass.
 *
 * A document is a flat sequence of [`Event`]s in document order. Text is
 * already entity-decoded, attribute values are decoded, and names are split
 * into a namespace URI and a local name.
 */

use indexmap::IndexMap;
use std::fmt;

/// A namespace-qualified name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    /// Namespace URI, `None` for names outside any namespace
    pub uri: Option<String>,
    /// Local part of the name
    pub name: String,
}

impl QName {
    pub fn new(uri: Option<&str>, name: &str) -> Self {
        Self {
            uri: uri.map(str::to_string),
            name: name.to_string(),
        }
    }

    /// A name outside any namespace
    pub fn local(name: &str) -> Self {
        Self::new(None, name)
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.uri {
            Some(uri) => write!(f, "{{{}}}{}", uri, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Attributes of a start tag, in source order
pub type Attributes = IndexMap<QName, String>;

/// Payload of a `<!DOCTYPE ...>` declaration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocType {
    pub name: String,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
    pub internal_subset: Option<String>,
}

/// Payload of a start tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartElement {
    pub name: QName,
    pub attributes: Attributes,
    /// The tag was written `<name/>`; the matching end event follows immediately
    pub self_closing: bool,
}

impl StartElement {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Attributes::new(),
            self_closing: false,
        }
    }

    pub fn with_attribute(mut self, name: QName, value: &str) -> Self {
        self.attributes.insert(name, value.to_string());
        self
    }

    /// Value of an attribute outside any namespace
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(&QName::local(name))
            .map(String::as_str)
    }
}

/// What happened at one point of the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    XmlDecl {
        version: String,
        encoding: Option<String>,
        standalone: Option<String>,
    },
    DocType(DocType),
    StartElement(StartElement),
    EndElement(QName),
    Text(String),
    Comment(String),
    ProcessingInstruction(String),
    CData(String),
}

/// One event of the stream, with the line it starts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub line: usize,
}

impl Event {
    pub fn new(kind: EventKind, line: usize) -> Self {
        Self { kind, line }
    }

    pub fn text(value: &str, line: usize) -> Self {
        Self::new(EventKind::Text(value.to_string()), line)
    }

    pub fn start(start: StartElement, line: usize) -> Self {
        Self::new(EventKind::StartElement(start), line)
    }

    pub fn end(name: QName, line: usize) -> Self {
        Self::new(EventKind::EndElement(name), line)
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, EventKind::Text(_))
    }
}

/// Merge runs of adjacent text events into one
///
/// Passes that split text (the translator emits one text per unit) use this
/// so their output compares equal to the parsed input.
pub fn coalesce_text(events: Vec<Event>) -> Vec<Event> {
    let mut merged: Vec<Event> = Vec::with_capacity(events.len());
    for event in events {
        if let (EventKind::Text(value), Some(Event { kind: EventKind::Text(previous), .. })) =
            (&event.kind, merged.last_mut())
        {
            previous.push_str(value);
            continue;
        }
        if matches!(&event.kind, EventKind::Text(value) if value.is_empty()) {
            continue;
        }
        merged.push(event);
    }
    merged
}
