/*!
 * Message catalogs.
 *
 * The translator only needs [`Catalog::lookup`]; the extractor side fills a
 * catalog with [`Catalog::add_unit`]. [`MemoryCatalog`] keeps entries in
 * insertion order, keyed by context and serialized source, and is what the
 * PO reader and writer work on.
 */

use indexmap::IndexMap;

use crate::translation::message::{Message, Unit};

/// One source message with its translation and bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub context: Option<String>,
    pub source: Message,
    pub target: Option<Message>,
    pub fuzzy: bool,
    /// Extracted comments (`#.` lines)
    pub comments: Vec<String>,
    /// Where the source was found: (filename, line)
    pub references: Vec<(String, usize)>,
}

impl CatalogEntry {
    pub fn new(source: Message, context: Option<&str>) -> Self {
        Self {
            context: context.map(str::to_string),
            source,
            target: None,
            fuzzy: false,
            comments: Vec::new(),
            references: Vec::new(),
        }
    }

    /// A non-empty, non-fuzzy translation
    pub fn translation(&self) -> Option<&Message> {
        self.target
            .as_ref()
            .filter(|target| !self.fuzzy && !target.is_empty())
    }

    fn key(&self) -> (String, String) {
        entry_key(&self.source, self.context.as_deref())
    }
}

fn entry_key(source: &Message, context: Option<&str>) -> (String, String) {
    (context.unwrap_or_default().to_string(), source.serialize())
}

pub trait Catalog {
    /// Usable translation of `source` in `context`
    fn lookup(&self, source: &Message, context: Option<&str>) -> Option<Message>;

    /// Translation of `source`, or `source` itself when there is none
    fn gettext(&self, source: &Message, context: Option<&str>) -> Message {
        self.lookup(source, context)
            .unwrap_or_else(|| source.clone())
    }

    /// Record a source message; repeated sources gain a reference
    fn add_unit(
        &mut self,
        filename: Option<&str>,
        source: &Message,
        context: Option<&str>,
        line: usize,
    ) -> &CatalogEntry;

    /// Every entry, fuzzy ones included
    fn iter_units(&self) -> Box<dyn Iterator<Item = &CatalogEntry> + '_>;
}

/// Catalog held in memory, in insertion order
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    entries: IndexMap<(String, String), CatalogEntry>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, source: &Message, context: Option<&str>) -> Option<&CatalogEntry> {
        self.entries.get(&entry_key(source, context))
    }

    /// Insert or replace a whole entry
    pub fn insert(&mut self, entry: CatalogEntry) {
        self.entries.insert(entry.key(), entry);
    }

    /// Set the translation of `source`, adding the entry if needed
    pub fn set_translation(&mut self, source: &Message, context: Option<&str>, target: Message) {
        let entry = self
            .entries
            .entry(entry_key(source, context))
            .or_insert_with(|| CatalogEntry::new(source.clone(), context));
        entry.target = Some(target);
        entry.fuzzy = false;
    }

    /// Add every unit, in order
    pub fn add_units<'u>(&mut self, units: impl IntoIterator<Item = &'u Unit>) {
        for unit in units {
            self.add_unit(
                unit.filename.as_deref(),
                &unit.message,
                unit.context(),
                unit.line,
            );
        }
    }
}

impl Catalog for MemoryCatalog {
    fn lookup(&self, source: &Message, context: Option<&str>) -> Option<Message> {
        self.get(source, context)
            .and_then(CatalogEntry::translation)
            .cloned()
    }

    fn add_unit(
        &mut self,
        filename: Option<&str>,
        source: &Message,
        context: Option<&str>,
        line: usize,
    ) -> &CatalogEntry {
        let entry = self
            .entries
            .entry(entry_key(source, context))
            .or_insert_with(|| CatalogEntry::new(source.clone(), context));
        if let Some(filename) = filename {
            let reference = (filename.to_string(), line);
            if !entry.references.contains(&reference) {
                entry.references.push(reference);
            }
        }
        entry
    }

    fn iter_units(&self) -> Box<dyn Iterator<Item = &CatalogEntry> + '_> {
        Box::new(self.entries.values())
    }
}
