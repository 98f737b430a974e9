/*!
 * Integration tests for extraction and translation of whole documents
 */

use pretty_assertions::assert_eq;
use std::sync::Arc;
use xlate::errors::PipelineError;
use xlate::translation::{
    MemoryCatalog, Message, Segment, Segmenter, extract_units, translate_document,
    translate_events,
};
use xlate::xml::{ElementSchema, EventKind, Namespace, NamespaceRegistry, parse, serialize};
use crate::common;

fn message(serialized: &str) -> Message {
    Message::deserialize(serialized).expect("valid message")
}

fn catalog(entries: &[(&str, Option<&str>, &str)]) -> MemoryCatalog {
    let mut catalog = MemoryCatalog::new();
    for (source, context, target) in entries {
        catalog.set_translation(&message(source), *context, message(target));
    }
    catalog
}

/// Test a paragraph with an inline element
#[test]
fn test_extract_withInlineElement_shouldGiveOneUnitWithFormat() {
    common::init_logging();
    let units = common::extract("<p>Hello <em>world</em>!</p>", "en");

    assert_eq!(units.len(), 1);
    assert_eq!(units[0].context(), Some("paragraph"));
    assert_eq!(
        units[0].message.segments().cloned().collect::<Vec<_>>(),
        vec![
            Segment::Text("Hello ".to_string()),
            Segment::StartFormat(1),
            Segment::Text("world".to_string()),
            Segment::EndFormat(1),
            Segment::Text("!".to_string()),
        ]
    );
}

/// Test that an abbreviation does not split the sentence
#[test]
fn test_extract_withAbbreviation_shouldNotSplit() {
    assert_eq!(
        common::extract_messages("<p>This is Toto Inc. a big company.</p>", "en"),
        vec!["This is Toto Inc. a big company."]
    );
}

/// Test that decimals do not split the sentence
#[test]
fn test_extract_withDecimals_shouldKeepSentence() {
    assert_eq!(
        common::extract_messages("<p>The 12.54 and 12,54 and 152.</p>", "en"),
        vec!["The 12.54 and 12,54 and 152."]
    );
}

/// Test sentence splitting across an inline element
#[test]
fn test_extract_withSentencesInsideInline_shouldHoistInline() {
    let units = common::extract(
        "<p>Say: <em>hello world. It's me.</em> Do you remember me?</p>",
        "en",
    );

    let messages: Vec<String> = units.iter().map(|unit| unit.message.serialize()).collect();
    assert_eq!(
        messages,
        vec!["Say:", "hello world.", "It's me.", "Do you remember me?"]
    );
    assert!(units.iter().all(|unit| unit.context() == Some("paragraph")));
}

/// Test translation of a message with an inline element
#[test]
fn test_translate_withInlineElement_shouldRestoreElement() {
    let catalog = catalog(&[(
        "Say <g id=\"1\">hello world</g>!",
        Some("paragraph"),
        "Di <g id=\"1\">hola mundo</g>!",
    )]);

    let output = common::translate(
        "<p>Say <em class=\"greeting\" title=\"Greeting\">hello world</em>!</p>",
        &catalog,
    );

    assert_eq!(
        output,
        "<p>Di <em class=\"greeting\" title=\"Greeting\">hola mundo</em>!</p>"
    );
}

/// Test translation of units cut out of one message
#[test]
fn test_translate_withSeveralUnits_shouldKeepInlineAroundThem() {
    let catalog = catalog(&[
        ("Say:", Some("paragraph"), "Di:"),
        ("hello world.", Some("paragraph"), "hola mundo."),
        ("It's me.", Some("paragraph"), "Soy yo."),
        ("Do you remember me?", Some("paragraph"), "¿Te acuerdas de mí?"),
    ]);

    let output = common::translate(
        "<p>Say: <em>hello world. It's me.</em> Do you remember me?</p>",
        &catalog,
    );

    assert_eq!(
        output,
        "<p>Di: <em>hola mundo. Soy yo.</em> ¿Te acuerdas de mí?</p>"
    );
}

/// Test that a translation may move formats around
#[test]
fn test_translate_withReorderedFormats_shouldFollowTranslation() {
    let catalog = catalog(&[(
        "The <g id=\"1\">red</g> <g id=\"2\">car</g>",
        Some("paragraph"),
        "La <g id=\"2\">voiture</g> <g id=\"1\">rouge</g>",
    )]);

    let output = common::translate(
        "<p>The <b>red</b> <i>car</i></p>",
        &catalog,
    );

    assert_eq!(output, "<p>La <i>voiture</i> <b>rouge</b></p>");
}

/// Test attribute extraction and translation
#[test]
fn test_attribute_withTranslatableAlt_shouldBeExtractedAndTranslated() {
    let source = "<img alt=\"The beach\" src=\"x\"/>";

    let units = common::extract(source, "en");
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].message.serialize(), "The beach");
    assert_eq!(units[0].context(), Some("img[alt]"));

    let catalog = catalog(&[("The beach", Some("img[alt]"), "La playa")]);
    assert_eq!(
        common::translate(source, &catalog),
        "<img alt=\"La playa\" src=\"x\"/>"
    );
}

/// Test that attribute white space is kept around the translation
#[test]
fn test_attribute_withSurroundingSpaces_shouldKeepThem() {
    let source = "<p title=\"  Tip \">Text</p>";

    let units = common::extract(source, "en");
    let messages: Vec<String> = units.iter().map(|unit| unit.message.serialize()).collect();
    assert_eq!(messages, vec!["Tip", "Text"]);
    assert_eq!(units[0].context(), Some("p[title]"));

    let catalog = catalog(&[("Tip", Some("p[title]"), "Consejo")]);
    assert_eq!(
        common::translate(source, &catalog),
        "<p title=\"  Consejo \">Text</p>"
    );
}

/// Test that Unicode white space around an attribute is handled the same way on both passes
#[test]
fn test_attribute_withNoBreakSpace_shouldBeTranslated() {
    let source = "<img alt=\"\u{a0}The beach\" src=\"x\"/>";

    let units = common::extract(source, "en");
    assert_eq!(units[0].message.serialize(), "The beach");

    let catalog = catalog(&[("The beach", Some("img[alt]"), "La playa")]);
    assert_eq!(
        common::translate(source, &catalog),
        "<img alt=\"\u{a0}La playa\" src=\"x\"/>"
    );
}

/// Test that every translatable attribute is scoped by its element and name
#[test]
fn test_attribute_contexts_shouldNameElementAndAttribute() {
    let source = "<form><input type=\"submit\" value=\"Send\"/><p title=\"Greeting\">Hi</p></form>";

    let found: Vec<(String, Option<String>)> = common::extract(source, "en")
        .iter()
        .map(|unit| (unit.message.serialize(), unit.context().map(str::to_string)))
        .collect();

    assert_eq!(
        found,
        vec![
            ("Send".to_string(), Some("input[value]".to_string())),
            ("Greeting".to_string(), Some("p[title]".to_string())),
            ("Hi".to_string(), Some("paragraph".to_string())),
        ]
    );
}

/// Test that a skip-content element becomes one opaque format
#[test]
fn test_skip_content_withCodeElement_shouldBeOpaque() {
    let source = "<p>Read <code>f(<b>x</b>)</code> now.</p>";

    let units = common::extract(source, "en");
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].message.serialize(), "Read <x id=\"1\"/> now.");

    let catalog = catalog(&[(
        "Read <x id=\"1\"/> now.",
        Some("paragraph"),
        "Lee <x id=\"1\"/> ahora.",
    )]);
    assert_eq!(
        common::translate(source, &catalog),
        "<p>Lee <code>f(<b>x</b>)</code> ahora.</p>"
    );
}

/// Test that an empty catalog gives the document back
#[test]
fn test_translate_withEmptyCatalog_shouldReturnDocument() {
    let expected = serialize(&parse(common::SAMPLE_PAGE).unwrap(), &common::registry()).unwrap();

    let output = common::translate(common::SAMPLE_PAGE, &MemoryCatalog::new());

    assert_eq!(output, expected);
    assert_eq!(output, common::SAMPLE_PAGE);
}

/// Test that translated events compare equal to the parsed input
#[test]
fn test_translate_events_withEmptyCatalog_shouldGiveSameEvents() {
    let events = parse("<div>\n  <p>One. <em>Two.</em>  Three.</p>\n  <pre> a  b </pre>\n</div>").unwrap();
    let segmenter = Segmenter::with_default_rules("en").unwrap();

    let translated =
        translate_events(&events, common::registry(), &segmenter, &MemoryCatalog::new()).unwrap();

    assert_eq!(translated, events);
}

/// Test the units of a whole page
#[test]
fn test_extract_withSamplePage_shouldFollowDocumentOrder() {
    let units = common::extract(common::SAMPLE_PAGE, "en");

    let found: Vec<(String, Option<&str>)> = units
        .iter()
        .map(|unit| (unit.message.serialize(), unit.context()))
        .collect();
    assert_eq!(
        found,
        vec![
            ("Welcome".to_string(), Some("title")),
            ("Our company".to_string(), Some("heading")),
            ("This is Toto Inc. a big company.".to_string(), Some("paragraph")),
            ("We sell <g id=\"1\">fine</g> hats.".to_string(), Some("paragraph")),
            ("A red hat".to_string(), Some("img[alt]")),
        ]
    );
    assert_eq!(units[1].line, 7);
}

/// Test that preformatted text keeps its spaces
#[test]
fn test_extract_withPre_shouldKeepAllSpaces() {
    assert_eq!(
        common::extract_messages("<pre>  a  b.  c</pre>", "en"),
        vec!["  a  b.", "  c"]
    );
}

/// Test that preformatted text is translated with its spaces
#[test]
fn test_translate_withPre_shouldMatchUntrimmedUnits() {
    let catalog = catalog(&[("  a  b.", Some("pre"), "  x  y."), ("  c", Some("pre"), "  z")]);

    let output = common::translate("<pre>  a  b.  c</pre>", &catalog);

    assert_eq!(output, "<pre>  x  y.  z</pre>");
}

/// Test that an empty inline pair at the start of a sentence stays in the unit
#[test]
fn test_extract_withLeadingImage_shouldKeepItInUnit() {
    assert_eq!(
        common::extract_messages("<p><img src=\"a.png\" alt=\"\"/>Hello world.</p>", "en"),
        vec!["<x id=\"1\"/>Hello world."]
    );
    assert_eq!(
        common::extract_messages("<p>Say. <code>a. b</code> end.</p>", "en"),
        vec!["Say.", "<x id=\"1\"/> end."]
    );
}

/// Test that a translator can move a leading empty pair
#[test]
fn test_translate_withMovedImage_shouldFollowTranslation() {
    let catalog = catalog(&[(
        "<x id=\"1\"/>Hello world.",
        Some("paragraph"),
        "Hola mundo.<x id=\"1\"/>",
    )]);

    let output = common::translate("<p><br/>Hello world.</p>", &catalog);

    assert_eq!(output, "<p>Hola mundo.<br/></p>");
}

/// Test that scripts and styles are never extracted
#[test]
fn test_extract_withScriptAndStyle_shouldSkipThem() {
    let source = "<div><script>var a = \"Hello.\";</script><style>p { }</style><p>Text</p></div>";
    assert_eq!(common::extract_messages(source, "en"), vec!["Text"]);
}

/// Test that comments inside a message survive translation
#[test]
fn test_translate_withCommentInMessage_shouldKeepComment() {
    let catalog = catalog(&[("Before <x id=\"1\"/> after", Some("paragraph"), "Antes <x id=\"1\"/> después")]);

    let output = common::translate("<p>Before <!-- note --> after</p>", &catalog);

    assert_eq!(output, "<p>Antes <!-- note --> después</p>");
}

/// Test that a translation with an unknown format id is an error
#[test]
fn test_translate_withUnknownFormatId_shouldFail() {
    let catalog = catalog(&[(
        "Hello <g id=\"1\">world</g>!",
        Some("paragraph"),
        "Hola <g id=\"2\">mundo</g>!",
    )]);
    let segmenter = Segmenter::with_default_rules("en").unwrap();
    let events = parse("<p>Hello <em>world</em>!</p>").unwrap();

    let result = translate_events(&events, common::registry(), &segmenter, &catalog);

    assert!(matches!(result, Err(PipelineError::TranslationError { id: 2, line: 1 })));
}

/// Test that a translation with broken formats falls back to the source
#[test]
fn test_translate_withMalformedTarget_shouldKeepSource() {
    common::init_logging();
    let mut broken = Message::new();
    broken.append_text("Hola ", 1, None);
    broken.append_start_format(1, 1);
    broken.append_text("mundo", 1, None);

    let mut catalog = MemoryCatalog::new();
    catalog.set_translation(&message("Hello <g id=\"1\">world</g>!"), Some("paragraph"), broken);

    let source = "<p>Hello <em>world</em>!</p>";
    assert_eq!(common::translate(source, &catalog), source);
}

/// Test that ids missing from a translation drop their markup
#[test]
fn test_translate_withMissingFormat_shouldDropIt() {
    let catalog = catalog(&[(
        "Hello <g id=\"1\">world</g>!",
        Some("paragraph"),
        "¡Hola mundo!",
    )]);

    assert_eq!(
        common::translate("<p>Hello <em>world</em>!</p>", &catalog),
        "<p>¡Hola mundo!</p>"
    );
}

/// Test that an element a strict namespace does not list is reported
#[test]
fn test_extract_withUnknownElement_shouldFail() {
    let mut registry = NamespaceRegistry::with_builtins();
    registry
        .register(Namespace::new(Some("urn:strict"), None).with_element(ElementSchema::block("doc")))
        .unwrap();
    let segmenter = Segmenter::with_default_rules("en").unwrap();
    let result = xlate::translation::Extractor::new(
        xlate::xml::EventReader::new("<doc xmlns=\"urn:strict\"><blink>x</blink></doc>"),
        Arc::new(registry),
        segmenter,
    )
    .collect::<Result<Vec<_>, _>>();

    assert!(matches!(
        result,
        Err(PipelineError::UnknownElement { ref name, line: 1, .. }) if name == "blink"
    ));
}

/// Test that XHTML names without metadata are handled as blocks
#[test]
fn test_extract_withLegacyXhtmlElements_shouldNotFail() {
    assert_eq!(
        common::extract_messages("<html><frameset><frame src=\"a.html\"/></frameset></html>", "en"),
        Vec::<String>::new()
    );
    assert_eq!(
        common::extract_messages("<p>Old <basefont size=\"3\"/> text.</p>", "en"),
        vec!["Old <x id=\"1\"/> text."]
    );
    assert_eq!(
        common::extract_messages("<p>Hello <nobr>there</nobr>.</p>", "en"),
        vec!["Hello <g id=\"1\">there</g>."]
    );
    assert_eq!(
        common::extract_messages("<div><marquee>Breaking news.</marquee></div>", "en"),
        vec!["Breaking news."]
    );
}

/// Test that a block nested in an inline element still gives its text
#[test]
fn test_extract_withBlockInsideInline_shouldExtractBlockText() {
    assert_eq!(
        common::extract_messages("<div><a href=\"#\"><p>Hello there.</p></a></div>", "en"),
        vec!["Hello there."]
    );
    assert_eq!(
        common::extract_messages("<div><span><div>Read me.</div></span></div>", "en"),
        vec!["Read me."]
    );
    assert_eq!(
        common::extract_messages("<div>Go <a href=\"#\">home<p>Now.</p></a></div>", "en"),
        vec!["Go", "home", "Now."]
    );
}

/// Test that a block nested in an inline element is translated in place
#[test]
fn test_translate_withBlockInsideInline_shouldKeepMarkup() {
    let catalog = catalog(&[
        ("Hello there.", Some("paragraph"), "Hola."),
        ("Go", Some("div"), "Ve"),
    ]);

    let output = common::translate(
        "<div>Go <a href=\"#\"><p>Hello there.</p></a></div>",
        &catalog,
    );

    assert_eq!(output, "<div>Ve <a href=\"#\"><p>Hola.</p></a></div>");
}

/// Test that elements of unknown namespaces are translatable blocks
#[test]
fn test_extract_withUnknownNamespace_shouldUseDefaultSchema() {
    let source = "<doc xmlns=\"urn:example:doc\"><title>Manual</title><para>Read it. Then go.</para></doc>";
    assert_eq!(
        common::extract_messages(source, "en"),
        vec!["Manual", "Read it.", "Then go."]
    );
}

/// Test the functions working with the process-wide registry
#[test]
fn test_global_registry_functions_shouldExtractAndTranslate() {
    let segmenter = Segmenter::with_default_rules("en").unwrap();
    let source = "<p>Good morning.</p>";

    let units = extract_units(source, &segmenter, Some("page.html")).unwrap();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].filename.as_deref(), Some("page.html"));

    let catalog = catalog(&[("Good morning.", Some("paragraph"), "Buenos días.")]);
    assert_eq!(
        translate_document(source, &segmenter, &catalog).unwrap(),
        "<p>Buenos días.</p>"
    );
}

/// Test that text events merge back after translation
#[test]
fn test_translate_events_shouldEmitOneTextPerRun() {
    let catalog = catalog(&[
        ("One.", Some("paragraph"), "Uno."),
        ("Two.", Some("paragraph"), "Dos."),
    ]);
    let segmenter = Segmenter::with_default_rules("en").unwrap();
    let events = parse("<p>One. Two.</p>").unwrap();

    let translated = translate_events(&events, common::registry(), &segmenter, &catalog).unwrap();

    assert_eq!(translated.len(), 3);
    assert_eq!(translated[1].kind, EventKind::Text("Uno. Dos.".to_string()));
}
