/*!
 * Sentence segmentation of messages.
 *
 * A message is cut where the SRX rules allow a break. Cuts never fall inside
 * an inline format pair; such a break moves to the end of the pair. Each
 * piece is then cleaned: format pairs enclosing the whole piece are set aside
 * as verbatim material, as is white space at its edges unless spaces are
 * kept, and what remains is segmented again. A piece that survives cleaning
 * unchanged becomes a unit.
 *
 * The output interleaves verbatim runs and units. Concatenating the verbatim
 * runs with the units' source entries gives back the original message, which
 * is what the translator re-emits for units without a translation.
 */

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use crate::errors::{PipelineError, PipelineResult};
use crate::srx::{Rule, SrxStore, default_rules};
use crate::translation::message::{Entry, Message, Segment, is_space};

/// One step of a segmented message
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    /// Material kept as is around units: white space, hoisted formats
    Verbatim(Vec<Entry>),
    Unit(SegmentedUnit),
}

impl Piece {
    /// Entries this piece stands for in the source message
    pub fn source_entries(&self) -> &[Entry] {
        match self {
            Piece::Verbatim(entries) => entries,
            Piece::Unit(unit) => &unit.source,
        }
    }
}

/// A unit cut out of a message
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedUnit {
    /// Normalized message with formats renumbered from 1
    pub message: Message,
    /// The entries the unit was built from, with the message's own ids
    pub source: Vec<Entry>,
    /// `ids[k - 1]` is the message id of unit format `k`
    pub ids: Vec<usize>,
}

impl SegmentedUnit {
    pub fn original_id(&self, id: usize) -> Option<usize> {
        id.checked_sub(1).and_then(|index| self.ids.get(index)).copied()
    }
}

/// Splits messages into units with a compiled rule list
#[derive(Debug, Clone)]
pub struct Segmenter {
    rules: Arc<[Rule]>,
    isolated_to_left: bool,
}

impl Segmenter {
    pub fn new(rules: Arc<[Rule]>) -> Self {
        Self {
            rules,
            isolated_to_left: false,
        }
    }

    /// Rules of `store` for `language`, with the store's format handling
    pub fn for_language(store: &SrxStore, language: &str) -> PipelineResult<Self> {
        Ok(Self {
            rules: store.compile(language)?,
            isolated_to_left: store.header().format_handles.isolated,
        })
    }

    /// The built-in rules for `language`
    pub fn with_default_rules(language: &str) -> PipelineResult<Self> {
        let store = default_rules()?;
        Self::for_language(&store, language)
    }

    /// Segment a message into verbatim runs and units
    pub fn segment(&self, message: &Message, keep_spaces: bool) -> PipelineResult<Vec<Piece>> {
        let mut pieces = Vec::new();
        self.segment_entries(message.entries().to_vec(), keep_spaces, &mut pieces)?;
        Ok(pieces)
    }

    /// Only the unit messages of [`Segmenter::segment`]
    pub fn units(&self, message: &Message, keep_spaces: bool) -> PipelineResult<Vec<Message>> {
        Ok(self
            .segment(message, keep_spaces)?
            .into_iter()
            .filter_map(|piece| match piece {
                Piece::Unit(unit) => Some(unit.message),
                Piece::Verbatim(_) => None,
            })
            .collect())
    }

    fn segment_entries(
        &self,
        entries: Vec<Entry>,
        keep_spaces: bool,
        pieces: &mut Vec<Piece>,
    ) -> PipelineResult<()> {
        for part in self.split(entries)? {
            let (left, center, right) = clean(part, keep_spaces);
            let changed = !left.is_empty() || !right.is_empty();

            push_verbatim(pieces, left);
            if changed {
                if !center.is_empty() {
                    self.segment_entries(center, keep_spaces, pieces)?;
                }
            } else if center.iter().filter_map(Entry::as_text).any(|text| !text.chars().all(is_space)) {
                pieces.push(Piece::Unit(build_unit(center, keep_spaces)?));
            } else {
                push_verbatim(pieces, center);
            }
            push_verbatim(pieces, right);
        }
        Ok(())
    }

    fn split(&self, entries: Vec<Entry>) -> PipelineResult<Vec<Vec<Entry>>> {
        let line = entries.first().map(|entry| entry.line).unwrap_or_default();
        let mut text = String::new();
        // top-level format pairs as (start, end) offsets into `text`
        let mut spans: Vec<(usize, usize)> = Vec::new();
        let mut depth = 0usize;
        let mut span_start = 0;

        for entry in &entries {
            match &entry.segment {
                Segment::Text(value) => text.push_str(value),
                Segment::StartFormat(_) => {
                    if depth == 0 {
                        span_start = text.len();
                    }
                    depth += 1;
                }
                Segment::EndFormat(id) => {
                    depth = depth.checked_sub(1).ok_or_else(|| PipelineError::SegmentationError {
                        line,
                        message: format!("format {} closed but never opened", id),
                    })?;
                    if depth == 0 {
                        spans.push((span_start, text.len()));
                    }
                }
            }
        }
        if depth > 0 {
            return Err(PipelineError::SegmentationError {
                line,
                message: "message ends inside a format".to_string(),
            });
        }

        let mut cuts = BTreeSet::new();
        for (position, _) in text.char_indices().skip(1) {
            let is_break = self
                .rules
                .iter()
                .find(|rule| rule.matches_at(&text, position))
                .is_some_and(|rule| rule.is_break);
            if !is_break {
                continue;
            }
            let position = spans
                .iter()
                .find(|(start, end)| *start < position && position < *end)
                .map_or(position, |(_, end)| *end);
            if position < text.len() {
                cuts.insert(position);
            }
        }

        if cuts.is_empty() {
            return Ok(vec![entries]);
        }
        Ok(self.cut(entries, cuts))
    }

    fn cut(&self, entries: Vec<Entry>, cuts: BTreeSet<usize>) -> Vec<Vec<Entry>> {
        let mut parts = Vec::new();
        let mut current = Vec::new();
        let mut cuts = cuts.into_iter().peekable();
        let mut entries = entries.into_iter().peekable();
        let mut offset = 0;

        while let Some(entry) = entries.next() {
            match &entry.segment {
                Segment::Text(value) => {
                    let end = offset + value.len();
                    let context = entry.context.as_deref();
                    let mut line = entry.line;
                    let mut rest = offset;

                    while let Some(&cut) = cuts.peek() {
                        if cut >= end {
                            break;
                        }
                        cuts.next();
                        let head = &value[rest - offset..cut - offset];
                        if !head.is_empty() {
                            current.push(Entry::text(head, line, context));
                            line += head.matches('\n').count();
                        }
                        flush(&mut parts, &mut current);
                        rest = cut;
                    }

                    let tail = &value[rest - offset..];
                    if !tail.is_empty() {
                        current.push(Entry::text(tail, line, context));
                    }
                    offset = end;
                }
                Segment::StartFormat(id) => {
                    let isolated = matches!(
                        entries.peek(),
                        Some(next) if next.segment == Segment::EndFormat(*id)
                    );
                    if cuts.peek() == Some(&offset) && !(isolated && self.isolated_to_left) {
                        cuts.next();
                        flush(&mut parts, &mut current);
                    }
                    current.push(entry);
                }
                Segment::EndFormat(_) => current.push(entry),
            }
        }

        flush(&mut parts, &mut current);
        parts
    }
}

fn flush(parts: &mut Vec<Vec<Entry>>, current: &mut Vec<Entry>) {
    if !current.is_empty() {
        parts.push(std::mem::take(current));
    }
}

fn push_verbatim(pieces: &mut Vec<Piece>, entries: Vec<Entry>) {
    if entries.is_empty() {
        return;
    }
    if let Some(Piece::Verbatim(previous)) = pieces.last_mut() {
        previous.extend(entries);
        return;
    }
    pieces.push(Piece::Verbatim(entries));
}

fn is_blank_text(entry: &Entry) -> bool {
    entry
        .as_text()
        .is_some_and(|text| text.chars().all(is_space))
}

fn is_pair(first: Option<&Entry>, second: Option<&Entry>) -> bool {
    match (first, second) {
        (Some(first), Some(second)) => match (&first.segment, &second.segment) {
            (Segment::StartFormat(start), Segment::EndFormat(end)) => start == end,
            _ => false,
        },
        _ => false,
    }
}

// Split off what a translator should not see: (left, center, right)
fn clean(entries: Vec<Entry>, keep_spaces: bool) -> (Vec<Entry>, Vec<Entry>, Vec<Entry>) {
    let mut center: VecDeque<Entry> = entries.into();
    let mut left: Vec<Entry> = Vec::new();
    let mut right: VecDeque<Entry> = VecDeque::new();

    // white space only texts at the edges
    if !keep_spaces {
        while center.front().is_some_and(is_blank_text) {
            left.extend(center.pop_front());
        }
        while center.back().is_some_and(is_blank_text) {
            if let Some(entry) = center.pop_back() {
                right.push_front(entry);
            }
        }
    }

    // format pairs enclosing everything
    while encloses(&center) {
        left.extend(center.pop_front());
        if let Some(entry) = center.pop_back() {
            right.push_front(entry);
        }
    }

    if keep_spaces {
        return (left, center.into(), right.into());
    }

    // leading and trailing white space of the edge texts
    if let Some(first) = center.front_mut() {
        if let Segment::Text(value) = &mut first.segment {
            let trimmed = value.trim_start_matches(is_space).len();
            let cut = value.len() - trimmed;
            if cut > 0 {
                left.push(Entry::text(&value[..cut], first.line, first.context.as_deref()));
                value.drain(..cut);
            }
        }
    }
    if let Some(last) = center.back_mut() {
        if let Segment::Text(value) = &mut last.segment {
            let keep = value.trim_end_matches(is_space).len();
            if keep < value.len() {
                let line = last.line + value[..keep].matches('\n').count();
                right.push_front(Entry::text(&value[keep..], line, last.context.as_deref()));
                value.truncate(keep);
            }
        }
    }
    center.retain(|entry| entry.as_text() != Some(""));

    (left, center.into(), right.into())
}

// The first and last entries open and close the same pair around something
fn encloses(center: &VecDeque<Entry>) -> bool {
    center.len() > 2 && is_pair(center.front(), center.back())
}

fn build_unit(entries: Vec<Entry>, keep_spaces: bool) -> PipelineResult<SegmentedUnit> {
    let mut message = Message::new();
    let mut ids: Vec<usize> = Vec::new();
    let count = entries.len();

    for (index, entry) in entries.iter().enumerate() {
        match &entry.segment {
            Segment::Text(value) => {
                let value = if keep_spaces {
                    value.clone()
                } else {
                    normalize_spaces(value, index > 0, index + 1 < count)
                };
                message.push(Entry {
                    segment: Segment::Text(value),
                    line: entry.line,
                    context: entry.context.clone(),
                });
            }
            Segment::StartFormat(id) => {
                ids.push(*id);
                message.append_start_format(ids.len(), entry.line);
            }
            Segment::EndFormat(id) => {
                let position = ids.iter().position(|open| open == id).ok_or_else(|| {
                    PipelineError::SegmentationError {
                        line: entry.line,
                        message: format!("format {} closed outside its unit", id),
                    }
                })?;
                message.append_end_format(position + 1, entry.line);
            }
        }
    }

    Ok(SegmentedUnit {
        message,
        source: entries,
        ids,
    })
}

/// Collapse white space runs to one space, keeping a single space at inner edges
fn normalize_spaces(value: &str, keep_leading: bool, keep_trailing: bool) -> String {
    let words: Vec<&str> = value.split(is_space).filter(|word| !word.is_empty()).collect();
    if words.is_empty() {
        return if value.is_empty() { String::new() } else { " ".to_string() };
    }

    let mut normalized = String::with_capacity(value.len());
    if keep_leading && value.starts_with(is_space) {
        normalized.push(' ');
    }
    normalized.push_str(&words.join(" "));
    if keep_trailing && value.ends_with(is_space) {
        normalized.push(' ');
    }
    normalized
}
