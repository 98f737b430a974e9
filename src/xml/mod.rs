/*!
 * XML layer: event vocabulary, parser, serializer and namespace metadata.
 */

pub mod event;
pub mod namespaces;
pub mod parser;
pub mod serializer;
pub mod xhtml;

pub use event::{Attributes, DocType, Event, EventKind, QName, StartElement};
pub use namespaces::{Datatype, ElementSchema, Namespace, NamespaceRegistry};
pub use parser::{EventReader, parse};
pub use serializer::{Serializer, serialize};
