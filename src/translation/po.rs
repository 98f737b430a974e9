/*!
 * Gettext PO files.
 *
 * Message ids and strings hold serialized messages, so inline formats show
 * up as `<g id="1">..</g>` and `<x id="2"/>` in the file. Reading a PO file
 * drops translations that do not parse back into a message, with a warning.
 */

use chrono::Local;
use log::warn;

use crate::errors::{PipelineError, PipelineResult};
use crate::translation::catalog::{Catalog, CatalogEntry, MemoryCatalog};
use crate::translation::message::Message;

/// Render a catalog as PO text, header entry first
pub fn write_po(catalog: &MemoryCatalog, language: Option<&str>) -> String {
    let mut output = String::new();

    output.push_str("msgid \"\"\nmsgstr \"\"\n");
    output.push_str(&format!(
        "\"POT-Creation-Date: {}\\n\"\n",
        Local::now().format("%Y-%m-%d %H:%M%z")
    ));
    if let Some(language) = language {
        output.push_str(&format!("\"Language: {}\\n\"\n", escape(language)));
    }
    output.push_str("\"MIME-Version: 1.0\\n\"\n");
    output.push_str("\"Content-Type: text/plain; charset=UTF-8\\n\"\n");
    output.push_str("\"Content-Transfer-Encoding: 8bit\\n\"\n");
    output.push_str(&format!(
        "\"X-Generator: {} {}\\n\"\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    ));

    for entry in catalog.iter_units() {
        output.push('\n');
        for comment in &entry.comments {
            output.push_str(&format!("#. {}\n", comment));
        }
        if !entry.references.is_empty() {
            let references: Vec<String> = entry
                .references
                .iter()
                .map(|(filename, line)| format!("{}:{}", filename, line))
                .collect();
            output.push_str(&format!("#: {}\n", references.join(" ")));
        }
        if entry.fuzzy {
            output.push_str("#, fuzzy\n");
        }
        if let Some(context) = &entry.context {
            write_keyword(&mut output, "msgctxt", context);
        }
        write_keyword(&mut output, "msgid", &entry.source.serialize());
        let target = entry
            .target
            .as_ref()
            .map(Message::serialize)
            .unwrap_or_default();
        write_keyword(&mut output, "msgstr", &target);
    }
    output
}

fn write_keyword(output: &mut String, keyword: &str, value: &str) {
    let lines: Vec<&str> = value.split_inclusive('\n').collect();
    if lines.len() <= 1 {
        output.push_str(&format!("{} \"{}\"\n", keyword, escape(value)));
        return;
    }
    output.push_str(&format!("{} \"\"\n", keyword));
    for line in lines {
        output.push_str(&format!("\"{}\"\n", escape(line)));
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\r' => escaped.push_str("\\r"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Context,
    Id,
    Str,
}

#[derive(Debug, Default)]
struct PendingEntry {
    line: usize,
    comments: Vec<String>,
    references: Vec<(String, usize)>,
    fuzzy: bool,
    context: Option<String>,
    id: Option<String>,
    text: Option<String>,
    last: Option<Field>,
}

impl PendingEntry {
    fn is_blank(&self) -> bool {
        self.id.is_none() && self.context.is_none() && self.text.is_none()
    }

    fn field(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Context => &mut self.context,
            Field::Id => &mut self.id,
            Field::Str => &mut self.text,
        }
    }
}

/// Parse PO text into a catalog
pub fn read_po(source: &str) -> PipelineResult<MemoryCatalog> {
    let mut catalog = MemoryCatalog::new();
    let mut pending = PendingEntry::default();

    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            finish(&mut catalog, std::mem::take(&mut pending))?;
            continue;
        }

        if let Some(comment) = trimmed.strip_prefix('#') {
            if pending.text.is_some() {
                finish(&mut catalog, std::mem::take(&mut pending))?;
            }
            if pending.is_blank() && pending.line == 0 {
                pending.line = line;
            }
            if let Some(references) = comment.strip_prefix(':') {
                pending
                    .references
                    .extend(references.split_whitespace().map(parse_reference));
            } else if let Some(flags) = comment.strip_prefix(',') {
                pending.fuzzy |= flags.split(',').any(|flag| flag.trim() == "fuzzy");
            } else if let Some(text) = comment.strip_prefix('.') {
                pending.comments.push(text.trim().to_string());
            }
            continue;
        }

        if trimmed.starts_with('"') {
            let value = unquote(trimmed, line)?;
            let field = pending.last.ok_or_else(|| invalid(line, "string without a keyword"))?;
            pending
                .field(field)
                .get_or_insert_with(String::new)
                .push_str(&value);
            continue;
        }

        let (keyword, rest) = trimmed
            .split_once(char::is_whitespace)
            .ok_or_else(|| invalid(line, "expected a keyword and a string"))?;
        let field = match keyword {
            "msgctxt" => Field::Context,
            "msgid" => Field::Id,
            "msgstr" => Field::Str,
            "msgid_plural" => return Err(invalid(line, "plural forms are not supported")),
            other if other.starts_with("msgstr[") => {
                return Err(invalid(line, "plural forms are not supported"));
            }
            other => return Err(invalid(line, &format!("unknown keyword '{}'", other))),
        };

        if pending.text.is_some() || (field != Field::Str && pending.field(field).is_some()) {
            finish(&mut catalog, std::mem::take(&mut pending))?;
        }
        if pending.line == 0 {
            pending.line = line;
        }
        let value = unquote(rest.trim(), line)?;
        *pending.field(field) = Some(value);
        pending.last = Some(field);
    }

    finish(&mut catalog, pending)?;
    Ok(catalog)
}

fn finish(catalog: &mut MemoryCatalog, pending: PendingEntry) -> PipelineResult<()> {
    if pending.is_blank() {
        return Ok(());
    }
    let line = pending.line;
    let id = pending
        .id
        .ok_or_else(|| invalid(line, "entry without msgid"))?;
    // header entry
    if id.is_empty() {
        return Ok(());
    }

    let source = Message::deserialize(&id).map_err(|err| invalid(line, &err.to_string()))?;
    let target = match pending.text.filter(|text| !text.is_empty()) {
        Some(text) => match Message::deserialize(&text) {
            Ok(target) => Some(target),
            Err(err) => {
                warn!("Dropping translation of '{}' at line {}: {}", id, line, err);
                None
            }
        },
        None => None,
    };

    let mut entry = CatalogEntry::new(source, pending.context.as_deref());
    entry.target = target;
    entry.fuzzy = pending.fuzzy;
    entry.comments = pending.comments;
    entry.references = pending.references;
    catalog.insert(entry);
    Ok(())
}

fn parse_reference(reference: &str) -> (String, usize) {
    match reference.rsplit_once(':') {
        Some((filename, line)) => match line.parse() {
            Ok(line) => (filename.to_string(), line),
            Err(_) => (reference.to_string(), 0),
        },
        None => (reference.to_string(), 0),
    }
}

fn unquote(value: &str, line: usize) -> PipelineResult<String> {
    let inner = value
        .strip_prefix('"')
        .and_then(|value| value.strip_suffix('"'))
        .filter(|_| value.len() >= 2)
        .ok_or_else(|| invalid(line, "expected a quoted string"))?;

    let mut unescaped = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => unescaped.push('\n'),
            Some('t') => unescaped.push('\t'),
            Some('r') => unescaped.push('\r'),
            Some('"') => unescaped.push('"'),
            Some('\\') => unescaped.push('\\'),
            other => {
                return Err(invalid(line, &format!("bad escape sequence \\{}", other.unwrap_or(' '))));
            }
        }
    }
    Ok(unescaped)
}

fn invalid(line: usize, message: &str) -> PipelineError {
    PipelineError::InvalidCatalog {
        line,
        message: message.to_string(),
    }
}
