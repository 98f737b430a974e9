/*!
 * Event stream serializer.
 *
 * Writes events back to markup through a `quick_xml::Writer`. Output is
 * deterministic: attributes always use double quotes, whitespace characters
 * inside attribute values become character references, and a start tag
 * marked self-closing is written as `<name/>` when its end event follows
 * directly.
 */

use std::borrow::Cow;

use quick_xml::Writer;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event as XmlEvent};

use crate::errors::{PipelineError, PipelineResult};
use crate::xml::event::{DocType, Event, EventKind, QName, StartElement};
use crate::xml::namespaces::{NamespaceRegistry, XML_URI, XMLNS_URI};

/// Serialize a complete event sequence
pub fn serialize(events: &[Event], registry: &NamespaceRegistry) -> PipelineResult<String> {
    let mut serializer = Serializer::new(registry);
    for event in events {
        serializer.write(event)?;
    }
    serializer.finish()
}

/// Encoding named by the XML declaration, if the stream starts with one
pub fn declared_encoding(events: &[Event]) -> Option<&str> {
    events.iter().find_map(|event| match &event.kind {
        EventKind::XmlDecl { encoding, .. } => encoding.as_deref(),
        _ => None,
    })
}

// (prefix, uri); a `None` prefix is the default namespace
type Scope = Vec<(Option<String>, String)>;

/// Incremental serializer, one event at a time
pub struct Serializer<'r> {
    registry: &'r NamespaceRegistry,
    scopes: Vec<Scope>,
    // self-closing start tag held back until the next event shows whether it is empty
    pending: Option<(BytesStart<'static>, usize)>,
    writer: Writer<Vec<u8>>,
}

impl<'r> Serializer<'r> {
    pub fn new(registry: &'r NamespaceRegistry) -> Self {
        Self {
            registry,
            scopes: Vec::new(),
            pending: None,
            writer: Writer::new(Vec::new()),
        }
    }

    pub fn write(&mut self, event: &Event) -> PipelineResult<()> {
        let line = event.line;
        if let EventKind::EndElement(name) = &event.kind {
            match self.pending.take() {
                Some((start, _)) => self.emit(XmlEvent::Empty(start), line)?,
                None => {
                    let name = self.element_name(name);
                    self.emit(XmlEvent::End(BytesEnd::new(name)), line)?;
                }
            }
            self.scopes.pop();
            return Ok(());
        }

        self.flush_pending()?;
        match &event.kind {
            EventKind::XmlDecl {
                version,
                encoding,
                standalone,
            } => self.emit(
                XmlEvent::Decl(BytesDecl::new(
                    version,
                    encoding.as_deref(),
                    standalone.as_deref(),
                )),
                line,
            ),
            EventKind::DocType(doctype) => self.emit(
                XmlEvent::DocType(BytesText::from_escaped(doctype_content(doctype))),
                line,
            ),
            EventKind::StartElement(start) => self.write_start(start, line),
            EventKind::Text(value) => {
                self.emit(XmlEvent::Text(BytesText::from_escaped(escape_text(value))), line)
            }
            EventKind::Comment(value) => {
                self.emit(XmlEvent::Comment(BytesText::from_escaped(value.as_str())), line)
            }
            EventKind::ProcessingInstruction(value) => {
                self.emit(XmlEvent::PI(BytesText::from_escaped(value.as_str())), line)
            }
            EventKind::CData(value) => {
                self.emit(XmlEvent::CData(BytesCData::new(value.as_str())), line)
            }
            EventKind::EndElement(_) => Ok(()),
        }
    }

    pub fn finish(mut self) -> PipelineResult<String> {
        self.flush_pending()?;
        String::from_utf8(self.writer.into_inner()).map_err(|err| PipelineError::MalformedXml {
            line: 0,
            message: err.to_string(),
        })
    }

    fn emit(&mut self, event: XmlEvent<'_>, line: usize) -> PipelineResult<()> {
        self.writer
            .write_event(event)
            .map_err(|err| PipelineError::MalformedXml {
                line,
                message: err.to_string(),
            })
    }

    fn flush_pending(&mut self) -> PipelineResult<()> {
        match self.pending.take() {
            Some((start, line)) => self.emit(XmlEvent::Start(start), line),
            None => Ok(()),
        }
    }

    fn write_start(&mut self, start: &StartElement, line: usize) -> PipelineResult<()> {
        let declarations: Scope = start
            .attributes
            .iter()
            .filter_map(|(name, value)| match name.uri() {
                None if name.name == "xmlns" => Some((None, value.clone())),
                Some(XMLNS_URI) => Some((Some(name.name.clone()), value.clone())),
                _ => None,
            })
            .collect();
        self.scopes.push(declarations);

        let mut tag = BytesStart::new(self.element_name(&start.name));
        for (name, value) in &start.attributes {
            let name = self.attribute_name(name);
            tag.push_attribute(Attribute {
                key: quick_xml::name::QName(name.as_bytes()),
                value: Cow::Owned(escape_attribute(value).into_bytes()),
            });
        }

        if start.self_closing {
            self.pending = Some((tag, line));
            Ok(())
        } else {
            self.emit(XmlEvent::Start(tag), line)
        }
    }

    fn element_name(&self, name: &QName) -> String {
        let Some(uri) = name.uri() else {
            return name.name.clone();
        };
        for scope in self.scopes.iter().rev() {
            if let Some((prefix, _)) = scope.iter().find(|(_, bound)| bound == uri) {
                return qualified(prefix.as_deref(), &name.name);
            }
        }
        qualified(self.registry.prefix_for(uri), &name.name)
    }

    fn attribute_name(&self, name: &QName) -> String {
        match name.uri() {
            None => name.name.clone(),
            Some(XMLNS_URI) => qualified(Some("xmlns"), &name.name),
            Some(XML_URI) => qualified(Some("xml"), &name.name),
            Some(uri) => {
                for scope in self.scopes.iter().rev() {
                    let bound = scope
                        .iter()
                        .find(|(prefix, bound)| prefix.is_some() && bound == uri);
                    if let Some((prefix, _)) = bound {
                        return qualified(prefix.as_deref(), &name.name);
                    }
                }
                qualified(self.registry.prefix_for(uri), &name.name)
            }
        }
    }
}

fn qualified(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, name),
        None => name.to_string(),
    }
}

fn doctype_content(doctype: &DocType) -> String {
    let mut content = doctype.name.clone();
    match (&doctype.public_id, &doctype.system_id) {
        (Some(public_id), Some(system_id)) => {
            content.push_str(&format!(" PUBLIC \"{}\" \"{}\"", public_id, system_id));
        }
        (Some(public_id), None) => content.push_str(&format!(" PUBLIC \"{}\"", public_id)),
        (None, Some(system_id)) => content.push_str(&format!(" SYSTEM \"{}\"", system_id)),
        (None, None) => {}
    }
    if let Some(subset) = &doctype.internal_subset {
        content.push_str(&format!(" [{}]", subset));
    }
    content
}

/// Escape character data; `>` is only escaped where it would close a CDATA marker
pub fn escape_text(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut previous = ['\0', '\0'];
    for c in value.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' if previous == [']', ']'] => output.push_str("&gt;"),
            _ => output.push(c),
        }
        previous = [previous[1], c];
    }
    output
}

pub fn escape_attribute(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '"' => output.push_str("&quot;"),
            '\t' => output.push_str("&#9;"),
            '\n' => output.push_str("&#10;"),
            '\r' => output.push_str("&#13;"),
            _ => output.push(c),
        }
    }
    output
}
