/*!
 * Block walker.
 *
 * Groups an event stream into the pieces both the extractor and the
 * translator work on: events that stand on their own, and messages built
 * from the text and inline markup between two block boundaries.
 *
 * Inline elements become numbered format pairs; the events they stand for
 * are kept aside so the translator can put them back. Skip-content inline
 * elements, and comments, processing instructions or CDATA sections inside
 * a message, are folded into a single opaque pair whose payload is the whole
 * subtree.
 *
 * A block element always ends the message. When it is nested in inline
 * elements that are still open, those inline elements leave the message:
 * their tags pass through as plain events and the text on each side of
 * them is a message of its own.
 */

use std::collections::HashMap;

use std::collections::VecDeque;
use std::sync::Arc;

use log::debug;

use crate::errors::{PipelineError, PipelineResult};
use crate::translation::message::{Message, Segment, is_space};
use crate::xml::event::{Event, EventKind, QName, StartElement};
use crate::xml::namespaces::NamespaceRegistry;
use crate::xml::parser::EventReader;

/// A translatable attribute value found on a start tag
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatableAttr {
    pub name: QName,
    /// `element[attribute]`
    pub context: String,
    pub value: String,
    pub line: usize,
}

impl TranslatableAttr {
    /// The value as looked up in a catalog, without surrounding white space
    pub fn source(&self) -> &str {
        self.value.trim()
    }

    /// White space before and after [`TranslatableAttr::source`]
    pub fn padding(&self) -> (&str, &str) {
        let start = self.value.len() - self.value.trim_start().len();
        let end = self.value.trim_end().len().max(start);
        (&self.value[..start], &self.value[end..])
    }
}

/// The events behind one format pair of a message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Format {
    pub start: Vec<Event>,
    pub end: Vec<Event>,
    /// Translatable attributes of the first start tag in `start`
    pub attributes: Vec<TranslatableAttr>,
}

/// A message together with what its format ids stand for
#[derive(Debug, Clone, PartialEq)]
pub struct BlockMessage {
    pub message: Message,
    /// `formats[id - 1]` backs format `id`
    pub formats: Vec<Format>,
    pub keep_spaces: bool,
}

impl BlockMessage {
    pub fn format(&self, id: usize) -> Option<&Format> {
        id.checked_sub(1).and_then(|index| self.formats.get(index))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// An event outside any message; start tags carry their translatable attributes
    Event {
        event: Event,
        attributes: Vec<TranslatableAttr>,
    },
    Message(BlockMessage),
}

impl Block {
    fn event(event: Event) -> Self {
        Block::Event {
            event,
            attributes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Inline(usize),
    /// An inline element whose tags were moved out of the message
    Detached,
    Block { keep_spaces: bool },
}

#[derive(Debug)]
struct Skip {
    depth: usize,
    /// Events of a subtree folded into format `id`; `None` passes the subtree through
    fold: Option<(usize, Vec<Event>)>,
}

/// Iterator of [`Block`]s over an event stream
pub struct BlockWalker<I> {
    events: I,
    registry: Arc<NamespaceRegistry>,
    pending: VecDeque<Block>,
    frames: Vec<Frame>,
    contexts: Vec<Option<String>>,
    current: Option<BlockMessage>,
    skip: Option<Skip>,
    finished: bool,
}

/// Walk the blocks of a document
pub fn blocks(source: &str, registry: Arc<NamespaceRegistry>) -> BlockWalker<EventReader<'_>> {
    BlockWalker::new(EventReader::new(source), registry)
}

impl<I> BlockWalker<I>
where
    I: Iterator<Item = PipelineResult<Event>>,
{
    pub fn new(events: I, registry: Arc<NamespaceRegistry>) -> Self {
        Self {
            events,
            registry,
            pending: VecDeque::new(),
            frames: Vec::new(),
            contexts: Vec::new(),
            current: None,
            skip: None,
            finished: false,
        }
    }

    pub fn registry(&self) -> &Arc<NamespaceRegistry> {
        &self.registry
    }

    fn handle(&mut self, event: Event) -> PipelineResult<()> {
        if self.skip.is_some() {
            self.handle_skipped(event);
            return Ok(());
        }

        match event.kind {
            EventKind::XmlDecl { .. } | EventKind::DocType(_) => {
                self.flush()?;
                self.pending.push_back(Block::event(event));
            }
            EventKind::StartElement(ref start) => {
                let start = start.clone();
                self.start_element(event, start)?;
            }
            EventKind::EndElement(_) => self.end_element(event)?,
            EventKind::Text(ref value) => {
                if self.current.is_some() || !value.chars().all(is_space) {
                    let context = self.context();
                    let line = event.line;
                    let message = self.open_message();
                    message.message.append_text(value, line, context.as_deref());
                } else {
                    self.pending.push_back(Block::event(event));
                }
            }
            EventKind::Comment(_) | EventKind::ProcessingInstruction(_) | EventKind::CData(_) => {
                match self.current.as_mut() {
                    Some(message) => {
                        let id = message.formats.len() + 1;
                        message.message.append_start_format(id, event.line);
                        message.message.append_end_format(id, event.line);
                        message.formats.push(Format {
                            start: vec![event],
                            ..Format::default()
                        });
                    }
                    None => self.pending.push_back(Block::event(event)),
                }
            }
        }
        Ok(())
    }

    fn start_element(&mut self, event: Event, start: StartElement) -> PipelineResult<()> {
        let line = event.line;
        let schema = self
            .registry
            .element_schema(start.name.uri(), &start.name.name, line)?;
        let attributes = self.translatable_attributes(&start, line)?;
        let (is_inline, skip_content, keep_spaces) =
            (schema.is_inline, schema.skip_content, schema.keep_spaces);
        // messages are scoped by their block, not by inline markup
        self.contexts
            .push(if is_inline { None } else { schema.context.clone() });

        let inside_inline = matches!(self.frames.last(), Some(Frame::Inline(_)));

        if is_inline && skip_content {
            let message = self.open_message();
            let id = message.formats.len() + 1;
            message.message.append_start_format(id, line);
            message.formats.push(Format {
                attributes,
                ..Format::default()
            });
            self.skip = Some(Skip {
                depth: 1,
                fold: Some((id, vec![event])),
            });
            return Ok(());
        }

        if is_inline {
            let message = self.open_message();
            let id = message.formats.len() + 1;
            message.message.append_start_format(id, line);
            message.formats.push(Format {
                start: vec![event],
                end: Vec::new(),
                attributes,
            });
            self.frames.push(Frame::Inline(id));
            return Ok(());
        }

        if inside_inline {
            self.detach_inline()?;
        }
        self.flush()?;
        self.pending.push_back(Block::Event { event, attributes });
        if skip_content {
            self.skip = Some(Skip {
                depth: 1,
                fold: None,
            });
        } else {
            self.frames.push(Frame::Block { keep_spaces });
        }
        Ok(())
    }

    fn end_element(&mut self, event: Event) -> PipelineResult<()> {
        self.contexts.pop();
        match self.frames.pop() {
            Some(Frame::Inline(id)) => {
                if let Some(message) = self.current.as_mut() {
                    message.message.append_end_format(id, event.line);
                    if let Some(format) = message.formats.get_mut(id - 1) {
                        format.end.push(event);
                    }
                }
            }
            Some(Frame::Block { .. } | Frame::Detached) | None => {
                self.flush()?;
                self.pending.push_back(Block::event(event));
            }
        }
        Ok(())
    }

    /// Move the open inline elements out of the current message
    fn detach_inline(&mut self) -> PipelineResult<()> {
        let mut open = Vec::new();
        for frame in self.frames.iter_mut().rev() {
            let Frame::Inline(id) = *frame else {
                break;
            };
            open.push(id);
            *frame = Frame::Detached;
        }
        let Some(block) = self.current.take() else {
            return Ok(());
        };

        let mut part = Self::empty_message(block.keep_spaces);
        let mut ids: HashMap<usize, usize> = HashMap::new();
        for entry in block.message.entries() {
            match entry.segment {
                Segment::StartFormat(id) if open.contains(&id) => {
                    let done = std::mem::replace(&mut part, Self::empty_message(block.keep_spaces));
                    self.emit(done)?;
                    ids.clear();

                    let format = block.format(id).cloned().unwrap_or_default();
                    let mut attributes = format.attributes;
                    for event in format.start {
                        self.pending.push_back(Block::Event {
                            event,
                            attributes: std::mem::take(&mut attributes),
                        });
                    }
                }
                Segment::StartFormat(id) => {
                    let renumbered = part.formats.len() + 1;
                    ids.insert(id, renumbered);
                    part.message.append_start_format(renumbered, entry.line);
                    part.formats.push(block.format(id).cloned().unwrap_or_default());
                }
                Segment::EndFormat(id) => {
                    let renumbered = ids.get(&id).copied().unwrap_or(id);
                    part.message.append_end_format(renumbered, entry.line);
                }
                Segment::Text(_) => part.message.push(entry.clone()),
            }
        }
        self.emit(part)
    }

    fn emit(&mut self, message: BlockMessage) -> PipelineResult<()> {
        if !message.message.is_empty() {
            self.current = Some(message);
            self.flush()?;
        }
        Ok(())
    }

    fn empty_message(keep_spaces: bool) -> BlockMessage {
        BlockMessage {
            message: Message::new(),
            formats: Vec::new(),
            keep_spaces,
        }
    }

    fn handle_skipped(&mut self, event: Event) {
        let Some(skip) = self.skip.as_mut() else {
            return;
        };
        match event.kind {
            EventKind::StartElement(_) => skip.depth += 1,
            EventKind::EndElement(_) => skip.depth -= 1,
            _ => {}
        }
        let line = event.line;
        match skip.fold.as_mut() {
            Some((_, buffer)) => buffer.push(event),
            None => self.pending.push_back(Block::event(event)),
        }

        if skip.depth > 0 {
            return;
        }
        let fold = skip.fold.take();
        self.skip = None;
        self.contexts.pop();
        if let (Some((id, buffer)), Some(message)) = (fold, self.current.as_mut()) {
            message.message.append_end_format(id, line);
            if let Some(format) = message.formats.get_mut(id - 1) {
                format.start = buffer;
            }
        }
    }

    fn translatable_attributes(
        &self,
        start: &StartElement,
        line: usize,
    ) -> PipelineResult<Vec<TranslatableAttr>> {
        let mut translatable = Vec::new();
        for (name, value) in &start.attributes {
            let datatype =
                self.registry
                    .attribute_datatype(&start.name, name, &start.attributes, line)?;
            if !datatype.is_translatable() || value.trim().is_empty() {
                continue;
            }
            translatable.push(TranslatableAttr {
                name: name.clone(),
                context: format!("{}[{}]", start.name.name, name.name),
                value: value.clone(),
                line,
            });
        }
        Ok(translatable)
    }

    fn context(&self) -> Option<String> {
        self.contexts.iter().rev().find_map(Clone::clone)
    }

    fn open_message(&mut self) -> &mut BlockMessage {
        let keep_spaces = self
            .frames
            .iter()
            .any(|frame| matches!(frame, Frame::Block { keep_spaces: true }));
        self.current
            .get_or_insert_with(|| Self::empty_message(keep_spaces))
    }

    fn flush(&mut self) -> PipelineResult<()> {
        let Some(message) = self.current.take() else {
            return Ok(());
        };
        message.message.validate()?;
        debug!(
            "Message at line {}: {}",
            message.message.line().unwrap_or_default(),
            message.message
        );
        self.pending.push_back(Block::Message(message));
        Ok(())
    }
}

impl<I> Iterator for BlockWalker<I>
where
    I: Iterator<Item = PipelineResult<Event>>,
{
    type Item = PipelineResult<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(block) = self.pending.pop_front() {
                return Some(Ok(block));
            }
            if self.finished {
                return None;
            }

            let result = match self.events.next() {
                Some(Ok(event)) => self.handle(event),
                Some(Err(err)) => Err(err),
                None => {
                    self.finished = true;
                    if self.skip.is_some() || !self.frames.is_empty() {
                        Err(PipelineError::MalformedXml {
                            line: self
                                .current
                                .as_ref()
                                .and_then(|message| message.message.line())
                                .unwrap_or_default(),
                            message: "document ends inside an element".to_string(),
                        })
                    } else {
                        self.flush()
                    }
                }
            };

            if let Err(err) = result {
                self.finished = true;
                self.pending.clear();
                return Some(Err(err));
            }
        }
    }
}
