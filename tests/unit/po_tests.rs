/*!
 * Tests for reading and writing gettext PO files
 */

use pretty_assertions::assert_eq;
use xlate::errors::PipelineError;
use xlate::translation::po::{read_po, write_po};
use xlate::translation::{Catalog, MemoryCatalog, Message};

const SAMPLE_PO: &str = r#"# Spanish translation
msgid ""
msgstr ""
"Language: es\n"
"Content-Type: text/plain; charset=UTF-8\n"

#. extracted from the home page
#: index.html:4 about.html:12
msgctxt "paragraph"
msgid "Hello <g id=\"1\">world</g>!"
msgstr "¡Hola <g id=\"1\">mundo</g>!"

#, fuzzy
msgid "Goodbye"
msgstr "Adiós"

msgid ""
"Two "
"lines"
msgstr "Dos líneas"

msgid "Untranslated"
msgstr ""
"#;

fn hello() -> Message {
    Message::deserialize("Hello <g id=\"1\">world</g>!").unwrap()
}

/// Test reading entries, their context, comments and references
#[test]
fn test_read_po_withSample_shouldReadEntries() {
    let catalog = read_po(SAMPLE_PO).unwrap();

    assert_eq!(catalog.len(), 4);
    let entry = catalog.get(&hello(), Some("paragraph")).unwrap();
    assert_eq!(entry.comments, vec!["extracted from the home page"]);
    assert_eq!(
        entry.references,
        vec![("index.html".to_string(), 4), ("about.html".to_string(), 12)]
    );
    assert_eq!(
        catalog.lookup(&hello(), Some("paragraph")).map(|target| target.serialize()),
        Some("¡Hola <g id=\"1\">mundo</g>!".to_string())
    );
}

/// Test that fuzzy and empty translations are not used
#[test]
fn test_read_po_withFuzzyAndEmptyEntries_shouldNotTranslate() {
    let catalog = read_po(SAMPLE_PO).unwrap();

    let goodbye = Message::from_text("Goodbye", 1);
    assert!(catalog.get(&goodbye, None).unwrap().fuzzy);
    assert!(catalog.lookup(&goodbye, None).is_none());
    assert!(catalog.lookup(&Message::from_text("Untranslated", 1), None).is_none());
}

/// Test that continuation lines are joined
#[test]
fn test_read_po_withContinuationLines_shouldJoinThem() {
    let catalog = read_po(SAMPLE_PO).unwrap();
    let target = catalog.lookup(&Message::from_text("Two lines", 1), None);
    assert_eq!(target, Some(Message::from_text("Dos líneas", 1)));
}

/// Test that plural forms are rejected
#[test]
fn test_read_po_withPluralForms_shouldFail() {
    let source = "msgid \"file\"\nmsgid_plural \"files\"\nmsgstr[0] \"fichier\"\n";
    let result = read_po(source);
    assert!(matches!(result, Err(PipelineError::InvalidCatalog { line: 2, .. })));
}

/// Test that a translation that is not a valid message is dropped
#[test]
fn test_read_po_withInvalidTranslation_shouldDropIt() {
    let source = "msgid \"Hello\"\nmsgstr \"<g id=\\\"1\\\">Hola\"\n";
    let catalog = read_po(source).unwrap();

    let entry = catalog.get(&Message::from_text("Hello", 1), None).unwrap();
    assert!(entry.target.is_none());
}

/// Test that a source that is not a valid message is an error
#[test]
fn test_read_po_withInvalidSource_shouldFail() {
    let source = "\nmsgid \"<b>Hello</b>\"\nmsgstr \"Hola\"\n";
    let result = read_po(source);
    assert!(matches!(result, Err(PipelineError::InvalidCatalog { line: 2, .. })));
}

/// Test that unknown keywords are rejected
#[test]
fn test_read_po_withUnknownKeyword_shouldFail() {
    assert!(read_po("msgfoo \"x\"\n").is_err());
    assert!(read_po("\"orphan string\"\n").is_err());
}

/// Test the written header and entry layout
#[test]
fn test_write_po_shouldWriteHeaderAndEntries() {
    let mut catalog = MemoryCatalog::new();
    catalog.add_unit(Some("index.html"), &hello(), Some("paragraph"), 4);
    catalog.add_unit(Some("about.html"), &hello(), Some("paragraph"), 12);
    catalog.add_unit(None, &Message::from_text("Say \"hi\"", 1), None, 1);

    let output = write_po(&catalog, Some("es"));

    assert!(output.starts_with("msgid \"\"\nmsgstr \"\"\n"));
    assert!(output.contains("\"Language: es\\n\"\n"));
    assert!(output.contains("\"X-Generator: xlate "));
    assert!(output.contains(concat!(
        "#: index.html:4 about.html:12\n",
        "msgctxt \"paragraph\"\n",
        "msgid \"Hello <g id=\\\"1\\\">world</g>!\"\n",
        "msgstr \"\"\n"
    )));
    assert!(output.contains("msgid \"Say \\\"hi\\\"\"\nmsgstr \"\"\n"));
}

/// Test that a written catalog reads back the same
#[test]
fn test_write_po_thenRead_shouldKeepEntries() {
    let mut catalog = MemoryCatalog::new();
    catalog.add_unit(Some("index.html"), &hello(), Some("paragraph"), 4);
    catalog.add_unit(Some("index.html"), &Message::from_text("Line one\nline two", 5), None, 5);
    catalog.set_translation(
        &hello(),
        Some("paragraph"),
        Message::deserialize("¡Hola <g id=\"1\">mundo</g>!").unwrap(),
    );

    let read = read_po(&write_po(&catalog, None)).unwrap();

    let original: Vec<_> = catalog.iter_units().cloned().collect();
    let reread: Vec<_> = read.iter_units().cloned().collect();
    assert_eq!(reread, original);
}
