/*!
 * Message extraction and translation.
 *
 * This module contains the passes that work on messages built from an XML
 * event stream. It is split into several submodules:
 *
 * - `message`: Messages, their format marks and units
 * - `segment`: Sentence segmentation driven by SRX rules
 * - `blocks`: Grouping of events into messages, shared by both passes
 * - `extract`: Units of a document
 * - `translate`: Catalog translations spliced back into the event stream
 * - `catalog`: Catalog interface and the in-memory catalog
 * - `po`: Gettext PO reading and writing
 */

// Re-export main types for easier usage
pub use self::catalog::{Catalog, CatalogEntry, MemoryCatalog};
pub use self::extract::{Extractor, extract_units};
pub use self::message::{Entry, Message, Segment, Unit};
pub use self::segment::{Piece, SegmentedUnit, Segmenter};
pub use self::translate::{Translator, translate_document, translate_events};

// Submodules
pub mod blocks;
pub mod catalog;
pub mod extract;
pub mod message;
pub mod po;
pub mod segment;
pub mod translate;
