/*!
 * Unit extraction.
 *
 * Turns a document into the units a translator has to work on. Attribute
 * units of an element come before the content units of that element.
 */

use std::collections::VecDeque;
use std::sync::Arc;

use crate::errors::PipelineResult;
use crate::translation::blocks::{Block, BlockWalker, TranslatableAttr};
use crate::translation::message::{Message, Unit};
use crate::translation::segment::{Piece, Segmenter};
use crate::xml::event::Event;
use crate::xml::namespaces::{self, NamespaceRegistry};
use crate::xml::parser::EventReader;

/// Lazy iterator of the units of an event stream
pub struct Extractor<I> {
    blocks: BlockWalker<I>,
    segmenter: Segmenter,
    filename: Option<String>,
    pending: VecDeque<Unit>,
    failed: bool,
}

impl<I> Extractor<I>
where
    I: Iterator<Item = PipelineResult<Event>>,
{
    pub fn new(events: I, registry: Arc<NamespaceRegistry>, segmenter: Segmenter) -> Self {
        Self {
            blocks: BlockWalker::new(events, registry),
            segmenter,
            filename: None,
            pending: VecDeque::new(),
            failed: false,
        }
    }

    /// Record `filename` on every produced unit
    pub fn with_filename(mut self, filename: &str) -> Self {
        self.filename = Some(filename.to_string());
        self
    }

    fn attribute_unit(&self, attribute: &TranslatableAttr) -> Unit {
        let message = Message::from_text(attribute.source(), attribute.line);
        Unit::new(message, Some(&attribute.context)).with_filename(self.filename.as_deref())
    }

    fn handle(&mut self, block: Block) -> PipelineResult<()> {
        match block {
            Block::Event { attributes, .. } => {
                for attribute in &attributes {
                    let unit = self.attribute_unit(attribute);
                    self.pending.push_back(unit);
                }
            }
            Block::Message(block) => {
                for attribute in block.formats.iter().flat_map(|format| &format.attributes) {
                    let unit = self.attribute_unit(attribute);
                    self.pending.push_back(unit);
                }
                for piece in self.segmenter.segment(&block.message, block.keep_spaces)? {
                    if let Piece::Unit(unit) = piece {
                        let context = unit.message.context().map(str::to_string);
                        self.pending.push_back(
                            Unit::new(unit.message, context.as_deref())
                                .with_filename(self.filename.as_deref()),
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

impl<I> Iterator for Extractor<I>
where
    I: Iterator<Item = PipelineResult<Event>>,
{
    type Item = PipelineResult<Unit>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(unit) = self.pending.pop_front() {
                return Some(Ok(unit));
            }
            if self.failed {
                return None;
            }
            match self.blocks.next()? {
                Ok(block) => {
                    if let Err(err) = self.handle(block) {
                        self.failed = true;
                        return Some(Err(err));
                    }
                }
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

/// Units of a document, with the process-wide namespace registry
pub fn extract_units(
    source: &str,
    segmenter: &Segmenter,
    filename: Option<&str>,
) -> PipelineResult<Vec<Unit>> {
    let mut extractor = Extractor::new(
        EventReader::new(source),
        namespaces::registry(),
        segmenter.clone(),
    );
    if let Some(filename) = filename {
        extractor = extractor.with_filename(filename);
    }
    extractor.collect()
}
