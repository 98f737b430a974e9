use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for language tag handling
///
/// SRX language patterns are matched against normalized tags such as `en`,
/// `en-US` or `zh-Hant-TW`. The primary subtag is reduced to its ISO 639-1
/// form whenever one exists, so `eng-us` and `EN_us` select the same rules.
/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

// ISO 639-2/B codes that differ from their 639-2/T counterpart
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("dut", "nld"),
    ("fre", "fra"),
    ("geo", "kat"),
    ("ger", "deu"),
    ("gre", "ell"),
    ("ice", "isl"),
    ("mac", "mkd"),
    ("may", "msa"),
    ("per", "fas"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

fn terminology_code(code: &str) -> &str {
    BIBLIOGRAPHIC_CODES
        .iter()
        .find(|(bibliographic, _)| *bibliographic == code)
        .map(|(_, terminology)| *terminology)
        .unwrap_or(code)
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2 code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 if Language::from_639_1(&normalized_code).is_some() => Ok(LanguageCodeType::Part1),
        3 if Language::from_639_3(&normalized_code).is_some() => Ok(LanguageCodeType::Part2T),
        3 if terminology_code(&normalized_code) != normalized_code => Ok(LanguageCodeType::Part2B),
        _ => Err(anyhow!("Invalid language code: {}", code)),
    }
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible
/// Falls back to ISO 639-2/T if no ISO 639-1 code exists
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 && Language::from_639_1(&normalized_code).is_some() {
        return Ok(normalized_code);
    }

    if normalized_code.len() == 3 {
        let part2t = terminology_code(&normalized_code);
        if let Some(lang) = Language::from_639_3(part2t) {
            return Ok(lang
                .to_639_1()
                .map(str::to_string)
                .unwrap_or_else(|| part2t.to_string()));
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Normalize a full language tag: `ENG_us` becomes `en-US`
pub fn normalize_language_tag(tag: &str) -> Result<String> {
    let mut subtags = tag.trim().split(['-', '_']);
    let primary = subtags
        .next()
        .filter(|primary| !primary.is_empty())
        .ok_or_else(|| anyhow!("Empty language tag"))?;

    let mut normalized = normalize_to_part1_or_part2t(primary)?;
    for subtag in subtags {
        if subtag.is_empty() {
            return Err(anyhow!("Invalid language tag: {}", tag));
        }
        normalized.push('-');
        match subtag.len() {
            2 => normalized.push_str(&subtag.to_uppercase()),
            4 => {
                let lower = subtag.to_lowercase();
                let mut chars = lower.chars();
                if let Some(first) = chars.next() {
                    normalized.extend(first.to_uppercase());
                    normalized.push_str(chars.as_str());
                }
            }
            _ => normalized.push_str(&subtag.to_lowercase()),
        }
    }
    Ok(normalized)
}

/// Get the English language name from a tag's primary subtag
pub fn get_language_name(tag: &str) -> Result<String> {
    let normalized = normalize_language_tag(tag)?;
    let primary = normalized.split('-').next().unwrap_or_default();
    let lang = if primary.len() == 2 {
        Language::from_639_1(primary)
    } else {
        Language::from_639_3(primary)
    }
    .ok_or_else(|| anyhow!("Failed to get language from code: {}", primary))?;

    Ok(lang.to_name().to_string())
}
