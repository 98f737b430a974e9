/*!
 * Messages and units.
 *
 * A message is the translatable content of one block: text interleaved with
 * numbered inline format marks. Its serialized form is the catalog key:
 *
 * ```text
 * Hello <g id="1">world</g>!<x id="2"/>
 * ```
 *
 * `<g>` wraps a format pair that encloses content, `<x/>` stands for a pair
 * with nothing inside (an image, a line break, a folded comment).
 */

use std::fmt;

use quick_xml::escape::partial_escape;

use crate::errors::{PipelineError, PipelineResult};
use crate::xml::event::EventKind;
use crate::xml::parser::EventReader;

/// One piece of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    StartFormat(usize),
    EndFormat(usize),
}

/// A segment with the line it comes from and, for text, its context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub segment: Segment,
    pub line: usize,
    pub context: Option<String>,
}

impl Entry {
    pub fn text(value: &str, line: usize, context: Option<&str>) -> Self {
        Self {
            segment: Segment::Text(value.to_string()),
            line,
            context: context.map(str::to_string),
        }
    }

    pub fn format(segment: Segment, line: usize) -> Self {
        Self {
            segment,
            line,
            context: None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.segment {
            Segment::Text(value) => Some(value),
            _ => None,
        }
    }
}

/// Text interleaved with numbered inline format marks
///
/// Equality only looks at the segments; lines and contexts are provenance.
#[derive(Debug, Clone, Default)]
pub struct Message {
    entries: Vec<Entry>,
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self.segments().eq(other.segments())
    }
}

impl Eq for Message {}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// A message made of a single text
    pub fn from_text(text: &str, line: usize) -> Self {
        let mut message = Self::new();
        message.append_text(text, line, None);
        message
    }

    /// Append text, merging it into a preceding text segment
    pub fn append_text(&mut self, text: &str, line: usize, context: Option<&str>) {
        self.push(Entry::text(text, line, context));
    }

    pub fn append_start_format(&mut self, id: usize, line: usize) {
        self.push(Entry::format(Segment::StartFormat(id), line));
    }

    pub fn append_end_format(&mut self, id: usize, line: usize) {
        self.push(Entry::format(Segment::EndFormat(id), line));
    }

    pub(crate) fn push(&mut self, entry: Entry) {
        let Segment::Text(value) = &entry.segment else {
            self.entries.push(entry);
            return;
        };
        if value.is_empty() {
            return;
        }
        if let Some(last) = self.entries.last_mut() {
            if let Segment::Text(previous) = &mut last.segment {
                previous.push_str(value);
                if last.context.is_none() {
                    last.context = entry.context;
                }
                return;
            }
        }
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> + '_ {
        self.entries.iter().map(|entry| &entry.segment)
    }

    /// Line of the first segment
    pub fn line(&self) -> Option<usize> {
        self.entries.first().map(|entry| entry.line)
    }

    /// Context of the first text that has one
    pub fn context(&self) -> Option<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.as_text().is_some())
            .find_map(|entry| entry.context.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether some text is more than white space
    pub fn has_text(&self) -> bool {
        self.entries
            .iter()
            .filter_map(Entry::as_text)
            .any(|text| !text.chars().all(is_space))
    }

    /// All text segments concatenated
    pub fn text(&self) -> String {
        self.entries.iter().filter_map(Entry::as_text).collect()
    }

    /// Format ids in the order they are opened
    pub fn format_ids(&self) -> Vec<usize> {
        self.segments()
            .filter_map(|segment| match segment {
                Segment::StartFormat(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Check that formats are unique, properly nested and all closed
    pub fn validate(&self) -> PipelineResult<()> {
        let mut open: Vec<(usize, usize)> = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for entry in &self.entries {
            match entry.segment {
                Segment::StartFormat(id) => {
                    if !seen.insert(id) {
                        return Err(PipelineError::MalformedMessage(format!(
                            "format {} is opened twice",
                            id
                        )));
                    }
                    open.push((id, entry.line));
                }
                Segment::EndFormat(id) => match open.pop() {
                    Some((expected, _)) if expected == id => {}
                    Some((expected, _)) => {
                        return Err(PipelineError::MalformedMessage(format!(
                            "format {} closed while {} is open",
                            id, expected
                        )));
                    }
                    None => {
                        return Err(PipelineError::MalformedMessage(format!(
                            "format {} closed but never opened",
                            id
                        )));
                    }
                },
                Segment::Text(_) => {}
            }
        }

        match open.pop() {
            Some((id, line)) => Err(PipelineError::UnmatchedFormat { id, line }),
            None => Ok(()),
        }
    }

    /// Render as a catalog key
    pub fn serialize(&self) -> String {
        let mut output = String::new();
        let segments: Vec<&Segment> = self.segments().collect();
        let mut index = 0;

        while index < segments.len() {
            match segments[index] {
                Segment::Text(value) => output.push_str(&partial_escape(value)),
                Segment::StartFormat(id) => {
                    let collapsed = matches!(segments.get(index + 1), Some(Segment::EndFormat(end)) if end == id);
                    let closed = segments[index + 1..]
                        .iter()
                        .any(|segment| **segment == Segment::EndFormat(*id));
                    if collapsed || !closed {
                        output.push_str(&format!("<x id=\"{}\"/>", id));
                        if collapsed {
                            index += 1;
                        }
                    } else {
                        output.push_str(&format!("<g id=\"{}\">", id));
                    }
                }
                Segment::EndFormat(_) => output.push_str("</g>"),
            }
            index += 1;
        }
        output
    }

    /// Parse a serialized message back
    pub fn deserialize(source: &str) -> PipelineResult<Message> {
        let malformed = |message: String| PipelineError::MalformedMessage(message);
        let mut message = Message::new();
        let mut open: Vec<usize> = Vec::new();

        for event in EventReader::new(source) {
            let event = event.map_err(|err| malformed(err.to_string()))?;
            match event.kind {
                EventKind::StartElement(start) => {
                    if start.name.uri.is_some() || !matches!(start.name.name.as_str(), "g" | "x") {
                        return Err(malformed(format!("unexpected element <{}>", start.name)));
                    }
                    let id = start
                        .attribute("id")
                        .and_then(|id| id.trim().parse::<usize>().ok())
                        .filter(|id| *id > 0)
                        .ok_or_else(|| malformed(format!("<{}> without a valid id", start.name)))?;
                    open.push(id);
                    message.append_start_format(id, event.line);
                }
                EventKind::EndElement(_) => {
                    let id = open
                        .pop()
                        .ok_or_else(|| malformed("unbalanced end tag".to_string()))?;
                    message.append_end_format(id, event.line);
                }
                EventKind::Text(value) | EventKind::CData(value) => {
                    message.append_text(&value, event.line, None);
                }
                EventKind::Comment(_) => {}
                other => return Err(malformed(format!("unexpected markup {:?}", other))),
            }
        }

        message.validate().map_err(|err| match err {
            PipelineError::UnmatchedFormat { id, .. } => {
                malformed(format!("format {} is never closed", id))
            }
            other => other,
        })?;
        Ok(message)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

/// White space as far as segmentation is concerned
pub fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// A translatable message with its context and where it was found
#[derive(Debug, Clone)]
pub struct Unit {
    pub message: Message,
    pub context: Option<String>,
    pub filename: Option<String>,
    pub line: usize,
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message && self.context == other.context
    }
}

impl Eq for Unit {}

impl Unit {
    pub fn new(message: Message, context: Option<&str>) -> Self {
        let line = message.line().unwrap_or_default();
        Self {
            message,
            context: context.map(str::to_string),
            filename: None,
            line,
        }
    }

    pub fn with_filename(mut self, filename: Option<&str>) -> Self {
        self.filename = filename.map(str::to_string);
        self
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }
}
