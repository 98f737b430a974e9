/*!
 * Tests for sentence segmentation with the built-in rules
 */

use pretty_assertions::assert_eq;
use xlate::errors::PipelineError;
use xlate::translation::{Message, Piece, Segment, Segmenter};

fn segmenter(language: &str) -> Segmenter {
    Segmenter::with_default_rules(language).expect("built-in rules should load")
}

fn units(text: &str, language: &str, keep_spaces: bool) -> Vec<String> {
    segmenter(language)
        .units(&Message::from_text(text, 1), keep_spaces)
        .unwrap()
        .iter()
        .map(Message::serialize)
        .collect()
}

fn english(text: &str) -> Vec<String> {
    units(text, "en", false)
}

// "See <1>this</1>. Then <2>that</2> and <3/> more."
fn formatted() -> Message {
    let mut message = Message::new();
    message.append_text("See ", 1, Some("paragraph"));
    message.append_start_format(1, 1);
    message.append_text("this", 1, None);
    message.append_end_format(1, 1);
    message.append_text(". Then ", 1, None);
    message.append_start_format(2, 1);
    message.append_text("that", 1, None);
    message.append_end_format(2, 1);
    message.append_text(" and ", 1, None);
    message.append_start_format(3, 1);
    message.append_end_format(3, 1);
    message.append_text(" more.", 2, None);
    message
}

/// Test splitting at sentence terminators
#[test]
fn test_units_withSeveralSentences_shouldSplitAtTerminators() {
    assert_eq!(
        english("Hello. How are you? Fine!"),
        vec!["Hello.", "How are you?", "Fine!"]
    );
}

/// Test that a single sentence stays whole
#[test]
fn test_units_withOneSentence_shouldGiveOneUnit() {
    assert_eq!(english("Hello world"), vec!["Hello world"]);
}

/// Test that English abbreviations do not end a sentence
#[test]
fn test_units_withCompanySuffix_shouldNotSplit() {
    assert_eq!(
        english("This is Toto Inc. a big company."),
        vec!["This is Toto Inc. a big company."]
    );
    assert_eq!(
        english("Ask Dr. Smith. He knows."),
        vec!["Ask Dr. Smith.", "He knows."]
    );
}

/// Test that language specific rules only apply to their language
#[test]
fn test_units_withFrenchTitle_shouldDependOnLanguage() {
    let text = "Voici Mme. Dupont. Elle est là.";

    assert_eq!(
        units(text, "fr", false),
        vec!["Voici Mme. Dupont.", "Elle est là."]
    );
    assert_eq!(
        units(text, "en", false),
        vec!["Voici Mme.", "Dupont.", "Elle est là."]
    );
}

/// Test that initials do not end a sentence
#[test]
fn test_units_withInitials_shouldNotSplit() {
    assert_eq!(
        english("J. David is here. E.T. is not."),
        vec!["J. David is here.", "E.T. is not."]
    );
}

/// Test that decimal numbers do not end a sentence
#[test]
fn test_units_withDecimals_shouldNotSplit() {
    assert_eq!(
        english("The 12.54 and 12,54 and 152."),
        vec!["The 12.54 and 12,54 and 152."]
    );
}

/// Test that an ellipsis ends a sentence once
#[test]
fn test_units_withEllipsis_shouldSplitAfterIt() {
    assert_eq!(english("Wait... What?"), vec!["Wait...", "What?"]);
}

/// Test that semicolons and colons end a unit
#[test]
fn test_units_withSemicolonsAndColons_shouldSplit() {
    assert_eq!(
        english("Note: read this; then go."),
        vec!["Note:", "read this;", "then go."]
    );
}

/// Test that tabs and newlines count as white space
#[test]
fn test_units_withTabsAndNewlines_shouldNormalizeThem() {
    assert_eq!(
        english("First\tline.\n\t Second \n line."),
        vec!["First line.", "Second line."]
    );
}

/// Test that keep-spaces units are kept byte for byte
#[test]
fn test_units_withKeepSpaces_shouldKeepAllSpaces() {
    assert_eq!(units("  a  b.  c", "en", true), vec!["  a  b.", "  c"]);
    assert_eq!(units("\n  Hello.\n", "en", true), vec!["\n  Hello.\n"]);
    assert_eq!(units("  a  b.  c", "en", false), vec!["a b.", "c"]);
}

/// Test that text without anything to translate gives no unit
#[test]
fn test_segment_withBlankMessage_shouldOnlyGiveVerbatim() {
    let mut message = Message::new();
    message.append_text("  \n ", 1, None);
    message.append_start_format(1, 1);
    message.append_end_format(1, 1);

    let pieces = segmenter("en").segment(&message, false).unwrap();
    assert_eq!(pieces.len(), 1);
    assert!(matches!(pieces[0], Piece::Verbatim(_)));
}

/// Test that formats inside a unit are kept and renumbered from 1
#[test]
fn test_units_withFormats_shouldRenumberFromOne() {
    let units: Vec<String> = segmenter("en")
        .units(&formatted(), false)
        .unwrap()
        .iter()
        .map(Message::serialize)
        .collect();

    assert_eq!(
        units,
        vec![
            "See <g id=\"1\">this</g>.",
            "Then <g id=\"1\">that</g> and <x id=\"2\"/> more.",
        ]
    );
}

/// Test that unit ids map back to the ids of the message
#[test]
fn test_segment_withFormats_shouldRecordOriginalIds() {
    let pieces = segmenter("en").segment(&formatted(), false).unwrap();
    let units: Vec<_> = pieces
        .iter()
        .filter_map(|piece| match piece {
            Piece::Unit(unit) => Some(unit),
            Piece::Verbatim(_) => None,
        })
        .collect();

    assert_eq!(units[0].ids, vec![1]);
    assert_eq!(units[1].ids, vec![2, 3]);
    assert_eq!(units[1].original_id(2), Some(3));
    assert_eq!(units[1].message.line(), Some(1));
}

/// Test that a break inside a format pair moves to the end of the pair
#[test]
fn test_units_withBreakInsideFormat_shouldHoistFormat() {
    let mut message = Message::new();
    message.append_text("Say: ", 1, None);
    message.append_start_format(1, 1);
    message.append_text("hello world. It's me.", 1, None);
    message.append_end_format(1, 1);
    message.append_text(" Do you remember me?", 1, None);

    let units: Vec<String> = segmenter("en")
        .units(&message, false)
        .unwrap()
        .iter()
        .map(Message::serialize)
        .collect();

    assert_eq!(
        units,
        vec!["Say:", "hello world.", "It's me.", "Do you remember me?"]
    );
}

/// Test that the pieces put back together give the original message
#[test]
fn test_segment_piecesConcatenated_shouldGiveOriginalMessage() {
    let original = formatted();
    let pieces = segmenter("en").segment(&original, false).unwrap();

    let mut rebuilt = Message::new();
    for entry in pieces.iter().flat_map(|piece| piece.source_entries()) {
        match &entry.segment {
            Segment::Text(value) => rebuilt.append_text(value, entry.line, None),
            Segment::StartFormat(id) => rebuilt.append_start_format(*id, entry.line),
            Segment::EndFormat(id) => rebuilt.append_end_format(*id, entry.line),
        }
    }

    assert_eq!(rebuilt, original);
}

/// Test that a message with an open format cannot be segmented
#[test]
fn test_segment_withUnbalancedMessage_shouldFail() {
    let mut message = Message::new();
    message.append_text("Open ", 3, None);
    message.append_start_format(1, 3);
    message.append_text("format.", 3, None);

    let result = segmenter("en").segment(&message, false);
    assert!(matches!(result, Err(PipelineError::SegmentationError { line: 3, .. })));
}
