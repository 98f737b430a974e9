/*!
 * Streaming XML parser producing [`Event`]s.
 *
 * Wraps quick-xml's namespace-aware reader. Names are resolved to URIs as
 * they are read, text and attribute values are entity-decoded, and the
 * reader keeps a running line count so every event knows where it starts.
 */

use std::borrow::Cow;

use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event as XmlEvent};
use quick_xml::name::ResolveResult;

use crate::errors::{PipelineError, PipelineResult};
use crate::xml::event::{Attributes, DocType, Event, EventKind, QName, StartElement};
use crate::xml::namespaces::{XML_URI, XMLNS_URI};

/// Parse a whole document into a vector of events
pub fn parse(input: &str) -> PipelineResult<Vec<Event>> {
    EventReader::new(input).collect()
}

/// Lazy event iterator over an in-memory document
pub struct EventReader<'a> {
    reader: NsReader<&'a [u8]>,
    input: &'a str,
    consumed: usize,
    line: usize,
    depth: usize,
    pending: Option<Event>,
    finished: bool,
}

impl<'a> EventReader<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut reader = NsReader::from_str(input);
        reader.trim_text(false);
        reader.expand_empty_elements(false);
        reader.check_end_names(true);

        Self {
            reader,
            input,
            consumed: 0,
            line: 1,
            depth: 0,
            pending: None,
            finished: false,
        }
    }

    fn advance_to(&mut self, position: usize) {
        let end = position.min(self.input.len());
        if end > self.consumed {
            self.line += self.input.as_bytes()[self.consumed..end]
                .iter()
                .filter(|&&byte| byte == b'\n')
                .count();
            self.consumed = end;
        }
    }

    fn read(&mut self) -> PipelineResult<Option<Event>> {
        if let Some(event) = self.pending.take() {
            return Ok(Some(event));
        }
        if self.finished {
            return Ok(None);
        }

        let position = self.reader.buffer_position();
        self.advance_to(position);
        let line = self.line;

        let (element_uri, event) = match self.reader.read_resolved_event() {
            Ok((resolved, event)) => (resolve_uri(resolved, line), event),
            Err(err) => return Err(malformed(line, err)),
        };

        let kind = match event {
            XmlEvent::Start(start) => {
                self.depth += 1;
                EventKind::StartElement(self.start_element(&start, element_uri?, false, line)?)
            }
            XmlEvent::Empty(start) => {
                let start = self.start_element(&start, element_uri?, true, line)?;
                self.pending = Some(Event::end(start.name.clone(), line));
                EventKind::StartElement(start)
            }
            XmlEvent::End(end) => {
                self.depth = self.depth.saturating_sub(1);
                let local = end.local_name();
                let name = utf8(local.as_ref(), line)?;
                EventKind::EndElement(QName {
                    uri: element_uri?,
                    name: name.to_string(),
                })
            }
            XmlEvent::Text(text) => {
                let value = text
                    .unescape_with(resolve_entity)
                    .map_err(|err| malformed(line, err))?;
                EventKind::Text(value.into_owned())
            }
            XmlEvent::CData(data) => EventKind::CData(utf8(&data, line)?.to_string()),
            XmlEvent::Comment(comment) => EventKind::Comment(utf8(&comment, line)?.to_string()),
            XmlEvent::PI(instruction) => {
                EventKind::ProcessingInstruction(utf8(&instruction, line)?.to_string())
            }
            XmlEvent::Decl(decl) => {
                let version = decl.version().map_err(|err| malformed(line, err))?;
                let encoding = match decl.encoding() {
                    Some(encoding) => Some(owned(encoding.map_err(|err| malformed(line, err))?, line)?),
                    None => None,
                };
                let standalone = match decl.standalone() {
                    Some(standalone) => {
                        Some(owned(standalone.map_err(|err| malformed(line, err))?, line)?)
                    }
                    None => None,
                };
                EventKind::XmlDecl {
                    version: owned(version, line)?,
                    encoding,
                    standalone,
                }
            }
            XmlEvent::DocType(doctype) => EventKind::DocType(parse_doctype(utf8(&doctype, line)?)),
            XmlEvent::Eof => {
                self.finished = true;
                if self.depth > 0 {
                    return Err(PipelineError::MalformedXml {
                        line,
                        message: "unexpected end of document".to_string(),
                    });
                }
                return Ok(None);
            }
        };

        Ok(Some(Event::new(kind, line)))
    }

    fn start_element(
        &self,
        start: &BytesStart<'_>,
        uri: Option<String>,
        self_closing: bool,
        line: usize,
    ) -> PipelineResult<StartElement> {
        let name = utf8(start.local_name().as_ref(), line)?.to_string();
        let mut attributes = Attributes::new();

        for attribute in start.attributes() {
            let attribute = attribute.map_err(|err| malformed(line, err))?;
            let raw_name = utf8(attribute.key.as_ref(), line)?;

            let name = if raw_name == "xmlns" {
                QName::local("xmlns")
            } else if let Some(prefix) = raw_name.strip_prefix("xmlns:") {
                QName::new(Some(XMLNS_URI), prefix)
            } else if let Some(local) = raw_name.strip_prefix("xml:") {
                QName::new(Some(XML_URI), local)
            } else {
                let (resolved, local) = self.reader.resolve_attribute(attribute.key);
                QName {
                    uri: resolve_uri(resolved, line)?,
                    name: utf8(local.as_ref(), line)?.to_string(),
                }
            };

            let value = attribute
                .unescape_value_with(resolve_entity)
                .map_err(|err| malformed(line, err))?;
            attributes.insert(name, value.into_owned());
        }

        Ok(StartElement {
            name: QName { uri, name },
            attributes,
            self_closing,
        })
    }
}

impl Iterator for EventReader<'_> {
    type Item = PipelineResult<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => None,
            Err(err) => {
                self.finished = true;
                self.pending = None;
                Some(Err(err))
            }
        }
    }
}

fn resolve_uri(resolved: ResolveResult<'_>, line: usize) -> PipelineResult<Option<String>> {
    match resolved {
        ResolveResult::Bound(namespace) => {
            Ok(Some(String::from_utf8_lossy(namespace.as_ref()).into_owned()))
        }
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(PipelineError::MalformedXml {
            line,
            message: format!("undeclared prefix '{}'", String::from_utf8_lossy(&prefix)),
        }),
    }
}

// Predefined XML entities plus the handful of HTML ones that show up in XHTML pages
fn resolve_entity(name: &str) -> Option<&'static str> {
    match name {
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        "apos" => Some("'"),
        "quot" => Some("\""),
        "nbsp" => Some("\u{a0}"),
        "copy" => Some("\u{a9}"),
        "reg" => Some("\u{ae}"),
        "trade" => Some("\u{2122}"),
        "hellip" => Some("\u{2026}"),
        "mdash" => Some("\u{2014}"),
        "ndash" => Some("\u{2013}"),
        "laquo" => Some("\u{ab}"),
        "raquo" => Some("\u{bb}"),
        "euro" => Some("\u{20ac}"),
        _ => None,
    }
}

fn parse_doctype(raw: &str) -> DocType {
    let raw = raw.trim();
    let name_end = raw
        .find(|c: char| c.is_whitespace() || c == '[')
        .unwrap_or(raw.len());
    let mut doctype = DocType {
        name: raw[..name_end].to_string(),
        ..DocType::default()
    };

    let mut rest = raw[name_end..].trim_start();
    if let Some(after) = rest.strip_prefix("PUBLIC") {
        let (public_id, after) = take_quoted(after.trim_start());
        let (system_id, after) = take_quoted(after.trim_start());
        doctype.public_id = public_id;
        doctype.system_id = system_id;
        rest = after.trim_start();
    } else if let Some(after) = rest.strip_prefix("SYSTEM") {
        let (system_id, after) = take_quoted(after.trim_start());
        doctype.system_id = system_id;
        rest = after.trim_start();
    }

    doctype.internal_subset = rest
        .strip_prefix('[')
        .and_then(|subset| subset.rfind(']').map(|end| subset[..end].to_string()));
    doctype
}

fn take_quoted(input: &str) -> (Option<String>, &str) {
    let quote = match input.chars().next() {
        Some(quote @ ('"' | '\'')) => quote,
        _ => return (None, input),
    };
    let body = &input[1..];
    match body.find(quote) {
        Some(end) => (Some(body[..end].to_string()), &body[end + 1..]),
        None => (None, input),
    }
}

fn utf8(bytes: &[u8], line: usize) -> PipelineResult<&str> {
    std::str::from_utf8(bytes).map_err(|err| malformed(line, err))
}

fn owned(bytes: Cow<'_, [u8]>, line: usize) -> PipelineResult<String> {
    utf8(&bytes, line).map(str::to_string)
}

fn malformed(line: usize, err: impl std::fmt::Display) -> PipelineError {
    PipelineError::MalformedXml {
        line,
        message: err.to_string(),
    }
}
