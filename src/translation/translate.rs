/*!
 * Translation pass.
 *
 * Walks the same blocks as the extractor. Each message is segmented, every
 * unit with a usable translation is replaced by it, and the format ids of
 * the translation are mapped back to the events they stood for in the
 * source. Units without a translation, and everything between units, are
 * re-emitted as they were.
 */

use std::collections::VecDeque;
use std::sync::Arc;

use log::warn;

use crate::errors::{PipelineError, PipelineResult};
use crate::translation::blocks::{Block, BlockMessage, BlockWalker, TranslatableAttr};
use crate::translation::catalog::Catalog;
use crate::translation::message::{Entry, Message, Segment};
use crate::translation::segment::{Piece, Segmenter};
use crate::xml::event::{Event, EventKind, coalesce_text};
use crate::xml::namespaces::{self, NamespaceRegistry};
use crate::xml::parser::EventReader;
use crate::xml::serializer::serialize;

/// Lazy iterator of the translated events of an event stream
pub struct Translator<'c, I, C: ?Sized> {
    blocks: BlockWalker<I>,
    segmenter: Segmenter,
    catalog: &'c C,
    pending: VecDeque<Event>,
    failed: bool,
}

impl<'c, I, C> Translator<'c, I, C>
where
    I: Iterator<Item = PipelineResult<Event>>,
    C: Catalog + ?Sized,
{
    pub fn new(
        events: I,
        registry: Arc<NamespaceRegistry>,
        segmenter: Segmenter,
        catalog: &'c C,
    ) -> Self {
        Self {
            blocks: BlockWalker::new(events, registry),
            segmenter,
            catalog,
            pending: VecDeque::new(),
            failed: false,
        }
    }

    fn handle(&mut self, block: Block) -> PipelineResult<()> {
        match block {
            Block::Event { mut event, attributes } => {
                self.translate_attributes(&mut event, &attributes);
                self.pending.push_back(event);
            }
            Block::Message(block) => {
                let entries = self.translate_message(&block)?;
                let events = self.expand(&block, entries);
                self.pending.extend(coalesce_text(events));
            }
        }
        Ok(())
    }

    /// Message-level entries of the translated message
    fn translate_message(&self, block: &BlockMessage) -> PipelineResult<Vec<Entry>> {
        let line = block.message.line().unwrap_or_default();
        let mut entries = Vec::new();

        for piece in self.segmenter.segment(&block.message, block.keep_spaces)? {
            let unit = match piece {
                Piece::Verbatim(verbatim) => {
                    entries.extend(verbatim);
                    continue;
                }
                Piece::Unit(unit) => unit,
            };

            let Some(target) = self.catalog.lookup(&unit.message, unit.message.context()) else {
                entries.extend(unit.source);
                continue;
            };
            if let Err(err) = target.validate() {
                warn!(
                    "Ignoring translation of '{}' at line {}: {}",
                    unit.message, line, err
                );
                entries.extend(unit.source);
                continue;
            }

            for entry in target.entries() {
                let segment = match &entry.segment {
                    Segment::Text(value) => Segment::Text(value.clone()),
                    Segment::StartFormat(id) => Segment::StartFormat(
                        unit.original_id(*id)
                            .ok_or(PipelineError::TranslationError { id: *id, line })?,
                    ),
                    Segment::EndFormat(id) => Segment::EndFormat(
                        unit.original_id(*id)
                            .ok_or(PipelineError::TranslationError { id: *id, line })?,
                    ),
                };
                entries.push(Entry {
                    segment,
                    line: unit.message.line().unwrap_or(line),
                    context: None,
                });
            }
        }
        Ok(entries)
    }

    fn expand(&self, block: &BlockMessage, entries: Vec<Entry>) -> Vec<Event> {
        let mut events = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.segment {
                Segment::Text(value) => events.push(Event::new(EventKind::Text(value), entry.line)),
                Segment::StartFormat(id) => {
                    if let Some(format) = block.format(id) {
                        let first = events.len();
                        events.extend(format.start.iter().cloned());
                        if let Some(event) = events.get_mut(first) {
                            self.translate_attributes(event, &format.attributes);
                        }
                    }
                }
                Segment::EndFormat(id) => {
                    if let Some(format) = block.format(id) {
                        events.extend(format.end.iter().cloned());
                    }
                }
            }
        }
        events
    }

    fn translate_attributes(&self, event: &mut Event, attributes: &[TranslatableAttr]) {
        let EventKind::StartElement(start) = &mut event.kind else {
            return;
        };
        for attribute in attributes {
            let source = Message::from_text(attribute.source(), attribute.line);
            let Some(target) = self.catalog.lookup(&source, Some(&attribute.context)) else {
                continue;
            };

            let (leading, trailing) = attribute.padding();
            if let Some(value) = start.attributes.get_mut(&attribute.name) {
                *value = format!("{}{}{}", leading, target.text(), trailing);
            }
        }
    }
}

impl<I, C> Iterator for Translator<'_, I, C>
where
    I: Iterator<Item = PipelineResult<Event>>,
    C: Catalog + ?Sized,
{
    type Item = PipelineResult<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if self.failed {
                return None;
            }
            let result = match self.blocks.next()? {
                Ok(block) => self.handle(block),
                Err(err) => Err(err),
            };
            if let Err(err) = result {
                self.failed = true;
                self.pending.clear();
                return Some(Err(err));
            }
        }
    }
}

/// Translated events of an event list, adjacent texts merged
pub fn translate_events<C: Catalog + ?Sized>(
    events: &[Event],
    registry: Arc<NamespaceRegistry>,
    segmenter: &Segmenter,
    catalog: &C,
) -> PipelineResult<Vec<Event>> {
    let translated = Translator::new(
        events.iter().cloned().map(Ok),
        registry,
        segmenter.clone(),
        catalog,
    )
    .collect::<PipelineResult<Vec<_>>>()?;
    Ok(coalesce_text(translated))
}

/// Translate a whole document, with the process-wide namespace registry
pub fn translate_document<C: Catalog + ?Sized>(
    source: &str,
    segmenter: &Segmenter,
    catalog: &C,
) -> PipelineResult<String> {
    let registry = namespaces::registry();
    let events = Translator::new(
        EventReader::new(source),
        Arc::clone(&registry),
        segmenter.clone(),
        catalog,
    )
    .collect::<PipelineResult<Vec<_>>>()?;
    serialize(&coalesce_text(events), &registry)
}
