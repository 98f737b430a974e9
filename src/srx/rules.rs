/*!
 * SRX rule store.
 *
 * Loads a segmentation rule document, resolves which rule lists apply to a
 * language through the ordered `languagemap` entries, and compiles them.
 * Compiled rule lists are memoized per language and shared behind an `Arc`.
 */

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use log::debug;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};

use crate::errors::{PipelineError, PipelineResult};
use crate::language_utils::normalize_language_tag;
use crate::xml::event::{EventKind, StartElement};
use crate::xml::parser::EventReader;

pub const SRX_URI: &str = "http://www.lisa.org/srx20";
pub const SRX1_URI: &str = "http://www.lisa.org/srx10";

static DEFAULT_RULES: Lazy<PipelineResult<Arc<SrxStore>>> =
    Lazy::new(|| SrxStore::parse(include_str!("default.srx")).map(Arc::new));

/// The rule set shipped with the crate
pub fn default_rules() -> PipelineResult<Arc<SrxStore>> {
    Result::clone(&DEFAULT_RULES)
}

/// Where formatting marks sitting exactly at a cut go; `true` means the preceding unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatHandles {
    pub start: bool,
    pub end: bool,
    pub isolated: bool,
}

impl Default for FormatHandles {
    fn default() -> Self {
        Self {
            start: false,
            end: true,
            isolated: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrxHeader {
    pub segment_subflows: bool,
    pub cascade: bool,
    pub format_handles: FormatHandles,
}

impl Default for SrxHeader {
    fn default() -> Self {
        Self {
            segment_subflows: true,
            cascade: false,
            format_handles: FormatHandles::default(),
        }
    }
}

/// A rule as written in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    pub is_break: bool,
    pub before: Option<String>,
    pub after: Option<String>,
}

/// A compiled break or no-break rule
///
/// The rule holds at a position when the text before it ends with a match of
/// the before-break expression and the text after it starts with a match of
/// the after-break expression.
#[derive(Debug, Clone)]
pub struct Rule {
    pub is_break: bool,
    before: Option<Regex>,
    after: Option<Regex>,
}

impl Rule {
    pub fn new(is_break: bool, before: Option<&str>, after: Option<&str>) -> PipelineResult<Self> {
        let before = before
            .filter(|pattern| !pattern.is_empty())
            .map(|pattern| compile(&format!("(?:{})\\z", pattern)))
            .transpose()?;
        let after = after
            .filter(|pattern| !pattern.is_empty())
            .map(|pattern| compile(&format!("\\A(?:{})", pattern)))
            .transpose()?;

        Ok(Self {
            is_break,
            before,
            after,
        })
    }

    /// Whether the rule applies at byte offset `position` of `text`
    pub fn matches_at(&self, text: &str, position: usize) -> bool {
        // the anchored side is cheap, try it first
        let after_ok = self
            .after
            .as_ref()
            .is_none_or(|regex| regex.is_match(&text[position..]));
        after_ok
            && self
                .before
                .as_ref()
                .is_none_or(|regex| regex.is_match(&text[..position]))
    }
}

fn compile(pattern: &str) -> PipelineResult<Regex> {
    RegexBuilder::new(pattern)
        .dot_matches_new_line(true)
        .multi_line(true)
        .build()
        .map_err(|err| PipelineError::InvalidSrx(format!("rule '{}': {}", pattern, err)))
}

#[derive(Debug)]
struct LanguageMap {
    pattern: Regex,
    rule_name: String,
}

/// A loaded SRX document
#[derive(Debug)]
pub struct SrxStore {
    header: SrxHeader,
    language_rules: IndexMap<String, Vec<RuleSpec>>,
    language_maps: Vec<LanguageMap>,
    compiled: RwLock<HashMap<String, Arc<[Rule]>>>,
}

impl SrxStore {
    /// Load an SRX document from its text
    pub fn parse(source: &str) -> PipelineResult<Self> {
        let mut header = SrxHeader::default();
        let mut language_rules: IndexMap<String, Vec<RuleSpec>> = IndexMap::new();
        let mut language_maps = Vec::new();

        let mut current_language: Option<String> = None;
        let mut current_rule: Option<RuleSpec> = None;
        let mut text = String::new();

        for event in EventReader::new(source) {
            let event = event?;
            match event.kind {
                EventKind::StartElement(start) if is_srx(start.name.uri()) => {
                    text.clear();
                    match start.name.name.as_str() {
                        "header" => {
                            header.segment_subflows = flag(&start, "segmentsubflows", true);
                            header.cascade = flag(&start, "cascade", false);
                        }
                        "formathandle" => {
                            let include = flag(&start, "include", false);
                            match start.attribute("type") {
                                Some("start") => header.format_handles.start = include,
                                Some("end") => header.format_handles.end = include,
                                Some("isolated") => header.format_handles.isolated = include,
                                other => {
                                    return Err(PipelineError::InvalidSrx(format!(
                                        "line {}: unknown formathandle type {:?}",
                                        event.line, other
                                    )));
                                }
                            }
                        }
                        "languagerule" => {
                            let name = required(&start, "languagerulename", event.line)?;
                            language_rules.insert(name.clone(), Vec::new());
                            current_language = Some(name);
                        }
                        "rule" => {
                            current_rule = Some(RuleSpec {
                                is_break: flag(&start, "break", true),
                                before: None,
                                after: None,
                            });
                        }
                        "languagemap" => {
                            let pattern = required(&start, "languagepattern", event.line)?;
                            let rule_name = required(&start, "languagerulename", event.line)?;
                            let pattern = RegexBuilder::new(&format!("\\A(?:{})", pattern))
                                .case_insensitive(true)
                                .dot_matches_new_line(true)
                                .multi_line(true)
                                .build()
                                .map_err(|err| {
                                    PipelineError::InvalidSrx(format!(
                                        "languagepattern '{}': {}",
                                        pattern, err
                                    ))
                                })?;
                            language_maps.push(LanguageMap { pattern, rule_name });
                        }
                        _ => {}
                    }
                }
                EventKind::Text(value) | EventKind::CData(value) => text.push_str(&value),
                EventKind::EndElement(name) if is_srx(name.uri()) => match name.name.as_str() {
                    "beforebreak" => {
                        if let Some(rule) = current_rule.as_mut() {
                            rule.before = Some(std::mem::take(&mut text));
                        }
                    }
                    "afterbreak" => {
                        if let Some(rule) = current_rule.as_mut() {
                            rule.after = Some(std::mem::take(&mut text));
                        }
                    }
                    "rule" => {
                        let rule = current_rule.take();
                        let rules = current_language
                            .as_ref()
                            .and_then(|language| language_rules.get_mut(language));
                        match (rule, rules) {
                            (Some(rule), Some(rules)) => rules.push(rule),
                            _ => {
                                return Err(PipelineError::InvalidSrx(format!(
                                    "line {}: rule outside of a languagerule",
                                    event.line
                                )));
                            }
                        }
                    }
                    "languagerule" => current_language = None,
                    _ => {}
                },
                _ => {}
            }
        }

        for map in &language_maps {
            if !language_rules.contains_key(&map.rule_name) {
                return Err(PipelineError::InvalidSrx(format!(
                    "languagemap refers to unknown languagerule '{}'",
                    map.rule_name
                )));
            }
        }

        Ok(Self {
            header,
            language_rules,
            language_maps,
            compiled: RwLock::new(HashMap::new()),
        })
    }

    /// Load an SRX document from disk
    pub fn load<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let source = std::fs::read_to_string(path.as_ref()).map_err(|err| {
            PipelineError::InvalidSrx(format!("{}: {}", path.as_ref().display(), err))
        })?;
        Self::parse(&source)
    }

    pub fn header(&self) -> &SrxHeader {
        &self.header
    }

    /// Names of every declared rule list, in declaration order
    pub fn languages(&self) -> Vec<&str> {
        self.language_rules.keys().map(String::as_str).collect()
    }

    /// Rules applying to `language`, following the cascade policy
    pub fn rules(&self, language: &str) -> Vec<&RuleSpec> {
        let language = normalize_language_tag(language).unwrap_or_else(|_| language.to_string());
        let mut rules = Vec::new();

        for map in &self.language_maps {
            if !map.pattern.is_match(&language) {
                continue;
            }
            if let Some(list) = self.language_rules.get(&map.rule_name) {
                rules.extend(list.iter());
                if !self.header.cascade {
                    break;
                }
            }
        }
        rules
    }

    /// Compiled rules for `language`, memoized
    pub fn compile(&self, language: &str) -> PipelineResult<Arc<[Rule]>> {
        if let Some(rules) = self.compiled.read().get(language) {
            return Ok(Arc::clone(rules));
        }

        let rules: Arc<[Rule]> = self
            .rules(language)
            .into_iter()
            .map(|spec| Rule::new(spec.is_break, spec.before.as_deref(), spec.after.as_deref()))
            .collect::<PipelineResult<Vec<_>>>()?
            .into();
        debug!("Compiled {} segmentation rules for '{}'", rules.len(), language);

        self.compiled
            .write()
            .insert(language.to_string(), Arc::clone(&rules));
        Ok(rules)
    }
}

fn is_srx(uri: Option<&str>) -> bool {
    matches!(uri, None | Some(SRX_URI) | Some(SRX1_URI))
}

fn flag(start: &StartElement, name: &str, default: bool) -> bool {
    start
        .attribute(name)
        .map(|value| !value.trim().eq_ignore_ascii_case("no"))
        .unwrap_or(default)
}

fn required(start: &StartElement, name: &str, line: usize) -> PipelineResult<String> {
    start.attribute(name).map(str::to_string).ok_or_else(|| {
        PipelineError::InvalidSrx(format!(
            "line {}: <{}> without '{}'",
            line, start.name.name, name
        ))
    })
}
