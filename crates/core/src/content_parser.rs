//! Header-delimited content parsing.
//!
//! Page content is free text split into sections by markdown-style headers
//! (`### Website`). Text before the first header belongs to the `short`
//! section. Inside a section named `data` (or the page type's configured
//! alias, e.g. `dati`) every `- key: value` line becomes its own entry.
//!
//! Parsing and header normalization are separate steps: [`parse_content`]
//! returns raw lower-cased labels, [`ParserConfig::normalize`] maps known
//! labels onto canonical field names.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::CoreError;
use crate::page::PageType;

/// Section key for text preceding the first header.
pub const SHORT_SECTION: &str = "short";

/// Section name whose lines are always read as `key: value` definitions.
pub const DATA_SECTION: &str = "data";

/// Data-section alias used when the configuration does not name one.
pub const DEFAULT_DATA_SECTION_ALIAS: &str = "dati";

/// Parsed sections, keyed by lower-cased label.
pub type Sections = BTreeMap<String, String>;

static HEADER_REGEX: OnceLock<Regex> = OnceLock::new();
static DEFINITION_REGEX: OnceLock<Regex> = OnceLock::new();

fn header_regex() -> &'static Regex {
    HEADER_REGEX.get_or_init(|| Regex::new(r"^#+\s*(.+)$").expect("valid header regex"))
}

fn definition_regex() -> &'static Regex {
    DEFINITION_REGEX
        .get_or_init(|| Regex::new(r"^\s*[-*]?\s*(.+)$").expect("valid definition regex"))
}

/// Returns the label of a header line, lower-cased and trimmed.
pub fn header_label(line: &str) -> Option<String> {
    header_regex()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|label| label.as_str().trim().to_lowercase())
}

/// Splits a data-section line into `(key, value)`. Lines without a colon
/// yield `None`.
fn definition(line: &str) -> Option<(String, String)> {
    let body = definition_regex().captures(line)?.get(1)?.as_str();
    let (left, right) = body.split_once(':')?;
    Some((left.trim().to_lowercase(), right.trim().to_string()))
}

/// Parse raw page content into its sections.
///
/// `data_section_alias` names an alternate spelling of the `data` section.
/// A section is only recorded when its trimmed text is non-empty; a later
/// section with the same label replaces an earlier one.
pub fn parse_content(content: &str, data_section_alias: &str) -> Sections {
    let mut sections = Sections::new();
    let mut current_header = SHORT_SECTION.to_string();
    let mut current_content = String::new();

    for line in content.lines() {
        if let Some(label) = header_label(line) {
            flush_section(&mut sections, &current_header, &current_content);
            current_content.clear();
            current_header = label;
            continue;
        }

        if current_header == DATA_SECTION || current_header == data_section_alias {
            if let Some((key, value)) = definition(line) {
                sections.insert(key, value);
            }
        } else {
            current_content.push_str(line);
            current_content.push('\n');
        }
    }

    flush_section(&mut sections, &current_header, &current_content);
    sections
}

fn flush_section(sections: &mut Sections, header: &str, content: &str) {
    let trimmed = content.trim();
    if !trimmed.is_empty() {
        sections.insert(header.to_string(), trimmed.to_string());
    }
}

/// Remove header markup, keeping header labels as plain lines.
pub fn strip_markup(content: &str) -> String {
    content
        .lines()
        .map(|line| match header_regex().captures(line).and_then(|c| c.get(1)) {
            Some(label) => label.as_str().trim(),
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Parsing configuration: header synonyms and per-type data-section aliases.
///
/// Loadable from JSON:
///
/// ```json
/// {
///   "synonyms": { "sito web": "website" },
///   "data_section_aliases": { "professionals": "dati personali" },
///   "default_data_section_alias": "dati"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Raw header label -> canonical field name.
    pub synonyms: HashMap<String, String>,
    /// Page type URL segment -> data section alias.
    pub data_section_aliases: HashMap<String, String>,
    pub default_data_section_alias: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        let synonyms = [
            ("sito web", "website"),
            ("sito", "website"),
            ("in breve", "short"),
            ("città", "city"),
            ("citta", "city"),
            ("area", "city"),
            ("settore", "sector"),
            ("competenze", "skills"),
            ("descrizione", "description"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            synonyms,
            data_section_aliases: HashMap::new(),
            default_data_section_alias: DEFAULT_DATA_SECTION_ALIAS.to_string(),
        }
    }
}

impl ParserConfig {
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let mut config: Self = serde_json::from_str(json)
            .map_err(|e| CoreError::Validation(format!("Invalid parser config: {e}")))?;
        // Labels are matched after lower-casing, so keys must be lower-case too.
        config.synonyms = config
            .synonyms
            .into_iter()
            .map(|(k, v)| (k.trim().to_lowercase(), v))
            .collect();
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CoreError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Validation(format!(
                "Cannot read parser config {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json_str(&json)
    }

    /// The data-section alias for a page type.
    pub fn data_section_alias(&self, page_type: PageType) -> &str {
        self.data_section_aliases
            .get(page_type.url_segment())
            .map(String::as_str)
            .unwrap_or(&self.default_data_section_alias)
    }

    /// Rename known labels to their canonical field names.
    ///
    /// When both a synonym and its canonical key are present, the canonical
    /// key wins.
    pub fn normalize(&self, sections: Sections) -> Sections {
        let mut canonical = Sections::new();
        let mut renamed = Sections::new();
        for (key, value) in sections {
            match self.synonyms.get(&key) {
                Some(target) => {
                    renamed.insert(target.clone(), value);
                }
                None => {
                    canonical.insert(key, value);
                }
            }
        }
        for (key, value) in renamed {
            canonical.entry(key).or_insert(value);
        }
        canonical
    }

    /// Parse and normalize content written for a page of `page_type`.
    pub fn parse(&self, content: &str, page_type: PageType) -> Sections {
        self.normalize(parse_content(content, self.data_section_alias(page_type)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
