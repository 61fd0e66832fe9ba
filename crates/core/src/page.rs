//! Directory pages: classification, derived fields, slugs and validation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::content_parser::{ParserConfig, Sections};
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum content length in bytes.
pub const MAX_CONTENT_LEN: usize = 100_000;

// ---------------------------------------------------------------------------
// PageType
// ---------------------------------------------------------------------------

/// What kind of entry a page describes. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Professional,
    Company,
    Community,
    Wiki,
}

impl PageType {
    pub const ALL: [PageType; 4] = [
        PageType::Professional,
        PageType::Company,
        PageType::Community,
        PageType::Wiki,
    ];

    /// Stable numeric code used for persistence.
    pub fn code(self) -> i16 {
        match self {
            PageType::Professional => 0,
            PageType::Company => 1,
            PageType::Community => 2,
            PageType::Wiki => 3,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(PageType::Professional),
            1 => Some(PageType::Company),
            2 => Some(PageType::Community),
            3 => Some(PageType::Wiki),
            _ => None,
        }
    }

    /// URL segment, also used as the search category name.
    pub fn url_segment(self) -> &'static str {
        match self {
            PageType::Professional => "professionals",
            PageType::Company => "companies",
            PageType::Community => "communities",
            PageType::Wiki => "wiki",
        }
    }

    /// Human-facing name of the category.
    pub fn display_name(self) -> &'static str {
        match self {
            PageType::Professional => "Professionisti",
            PageType::Company => "Aziende",
            PageType::Community => "Community",
            PageType::Wiki => "Wiki",
        }
    }

    pub fn from_url_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.url_segment() == segment)
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url_segment())
    }
}

impl FromStr for PageType {
    type Err = CoreError;

    /// Accepts either the numeric code or the URL segment.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = match s.parse::<i16>() {
            Ok(code) => Self::from_code(code),
            Err(_) => Self::from_url_segment(&s.to_lowercase()),
        };
        parsed.ok_or_else(|| CoreError::Validation(format!("Invalid page type '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// Fields derived from a page's approved content. Never edited directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFields {
    pub short: Option<String>,
    pub city: Option<String>,
    pub website: Option<String>,
    pub sector: Option<String>,
}

impl PageFields {
    pub fn from_sections(sections: &Sections) -> Self {
        let get = |key: &str| sections.get(key).cloned();
        Self {
            short: get("short"),
            city: get("city"),
            website: get("website"),
            sector: get("sector"),
        }
    }
}

/// A directory or wiki entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: DbId,
    pub title: String,
    pub slug: String,
    pub page_type: PageType,
    /// `None` marks a communally editable page.
    pub owner_id: Option<DbId>,
    pub approved_content: String,
    /// `None` until a revision is approved; such pages are never listed.
    pub approved_version_id: Option<DbId>,
    #[serde(flatten)]
    pub fields: PageFields,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Page {
    /// Whether the page may appear in public listings and search results.
    pub fn is_listed(&self) -> bool {
        self.approved_version_id.is_some()
    }

    /// Whether a revision with this id is newer than the approved one.
    pub fn is_pending(&self, revision_id: DbId) -> bool {
        revision_id > self.approved_version_id.unwrap_or(0)
    }

    pub fn url(&self) -> String {
        format!("/{}/{}", self.page_type.url_segment(), self.id)
    }
}

/// Input for creating a page.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPage {
    pub title: String,
    /// Derived from the title when `None`.
    pub slug: Option<String>,
    pub page_type: PageType,
}

/// The state written to a page when a revision is approved.
#[derive(Debug, Clone, PartialEq)]
pub struct Approval {
    pub content: String,
    pub version_id: DbId,
    pub fields: PageFields,
}

impl Approval {
    /// Build an approval for `content`, re-deriving the structured fields.
    pub fn new(
        content: &str,
        version_id: DbId,
        page_type: PageType,
        parser: &ParserConfig,
    ) -> Self {
        let sections = parser.parse(content, page_type);
        Self {
            content: content.to_string(),
            version_id,
            fields: PageFields::from_sections(&sections),
        }
    }
}

/// Number of listed pages per type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SiteStats {
    pub professionals: i64,
    pub companies: i64,
    pub communities: i64,
    pub wiki: i64,
}

impl SiteStats {
    pub fn add(&mut self, page_type: PageType, count: i64) {
        match page_type {
            PageType::Professional => self.professionals += count,
            PageType::Company => self.companies += count,
            PageType::Community => self.communities += count,
            PageType::Wiki => self.wiki += count,
        }
    }
}

// ---------------------------------------------------------------------------
// Slug generation
// ---------------------------------------------------------------------------

/// Generate a URL-safe slug from a page title.
///
/// Transliterates the title to ASCII, lower-cases it, turns every other
/// character into a hyphen, collapses hyphen runs and trims the ends.
pub fn generate_slug(title: &str) -> String {
    let ascii = deunicode::deunicode(title);
    let mut slug = String::with_capacity(ascii.len());
    let mut prev_hyphen = true;
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("Title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "Title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

/// Slugs are non-empty and contain only lowercase alphanumerics and hyphens.
pub fn validate_slug(slug: &str) -> Result<(), CoreError> {
    if slug.is_empty() {
        return Err(CoreError::Validation("Slug must not be empty".into()));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(CoreError::Validation(
            "Slug must contain only lowercase alphanumeric characters and hyphens".into(),
        ));
    }
    Ok(())
}

pub fn validate_content(content: &str) -> Result<(), CoreError> {
    if content.len() > MAX_CONTENT_LEN {
        return Err(CoreError::Validation(format!(
            "Content must be at most {MAX_CONTENT_LEN} characters"
        )));
    }
    Ok(())
}

/// Validate a new page and resolve its slug.
pub fn resolve_slug(input: &NewPage) -> Result<String, CoreError> {
    validate_title(&input.title)?;
    let slug = match input.slug.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => generate_slug(&input.title),
    };
    validate_slug(&slug)?;
    Ok(slug)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- PageType ------------------------------------------------------------

    #[test]
    fn page_type_codes_round_trip() {
        for t in PageType::ALL {
            assert_eq!(PageType::from_code(t.code()), Some(t));
        }
        assert_eq!(PageType::from_code(9), None);
    }

    #[test]
    fn page_type_from_str() {
        assert_eq!("0".parse::<PageType>().unwrap(), PageType::Professional);
        assert_eq!("companies".parse::<PageType>().unwrap(), PageType::Company);
        assert_eq!(" Wiki ".parse::<PageType>().unwrap(), PageType::Wiki);
    }

    #[test]
    fn malformed_page_type_is_validation_error() {
        assert!(matches!(
            "7".parse::<PageType>(),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            "shops".parse::<PageType>(),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn page_type_names() {
        assert_eq!(PageType::Professional.url_segment(), "professionals");
        assert_eq!(PageType::Community.url_segment(), "communities");
        assert_eq!(PageType::Company.display_name(), "Aziende");
        assert_eq!(PageType::Wiki.to_string(), "wiki");
    }

    // -- Page ----------------------------------------------------------------

    fn page(approved: Option<DbId>) -> Page {
        let now = chrono::Utc::now();
        Page {
            id: 7,
            title: "Acme".into(),
            slug: "acme".into(),
            page_type: PageType::Company,
            owner_id: None,
            approved_content: String::new(),
            approved_version_id: approved,
            fields: PageFields::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn unapproved_page_is_not_listed() {
        assert!(!page(None).is_listed());
        assert!(page(Some(3)).is_listed());
    }

    #[test]
    fn pending_is_strictly_newer_than_approved() {
        let p = page(Some(3));
        assert!(!p.is_pending(2));
        assert!(!p.is_pending(3));
        assert!(p.is_pending(4));
        assert!(page(None).is_pending(1));
    }

    #[test]
    fn page_url_uses_segment() {
        assert_eq!(page(None).url(), "/companies/7");
    }

    #[test]
    fn approval_derives_fields() {
        let approval = Approval::new(
            "Consulting\n### Sito web\nwww.x.com\n### Dati\n- Città: Rome\n- Settore: IT",
            12,
            PageType::Company,
            &ParserConfig::default(),
        );
        assert_eq!(approval.version_id, 12);
        assert_eq!(approval.fields.short.as_deref(), Some("Consulting"));
        assert_eq!(approval.fields.website.as_deref(), Some("www.x.com"));
        assert_eq!(approval.fields.city.as_deref(), Some("Rome"));
        assert_eq!(approval.fields.sector.as_deref(), Some("IT"));
    }

    #[test]
    fn site_stats_add() {
        let mut stats = SiteStats::default();
        stats.add(PageType::Wiki, 2);
        stats.add(PageType::Company, 1);
        assert_eq!(stats.wiki, 2);
        assert_eq!(stats.companies, 1);
        assert_eq!(stats.professionals, 0);
    }

    // -- Slugs ---------------------------------------------------------------

    #[test]
    fn slug_basic_title() {
        assert_eq!(generate_slug("Getting Started"), "getting-started");
    }

    #[test]
    fn slug_folds_accents() {
        assert_eq!(generate_slug("Città di Catania"), "citta-di-catania");
    }

    #[test]
    fn slug_transliterates_non_latin_titles() {
        assert_eq!(generate_slug("Москва Rust"), "moskva-rust");
        assert_eq!(generate_slug("東京"), "dong-jing");
    }

    #[test]
    fn slug_collapses_and_trims_hyphens() {
        assert_eq!(generate_slug("--foo---bar (v2)--"), "foo-bar-v2");
    }

    #[test]
    fn slug_of_symbols_is_empty() {
        assert_eq!(generate_slug("!!!"), "");
    }

    // -- Validation ----------------------------------------------------------

    #[test]
    fn title_rules() {
        assert!(validate_title("Acme").is_ok());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"a".repeat(MAX_TITLE_LEN + 1)).is_err());
    }

    #[test]
    fn title_limit_counts_characters() {
        assert!(validate_title(&"è".repeat(150)).is_ok());
        assert!(validate_title(&"è".repeat(MAX_TITLE_LEN)).is_ok());
        assert!(validate_title(&"è".repeat(MAX_TITLE_LEN + 1)).is_err());
    }

    #[test]
    fn slug_rules() {
        assert!(validate_slug("acme-srl").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Acme").is_err());
    }

    #[test]
    fn content_limit() {
        assert!(validate_content("hello").is_ok());
        assert!(validate_content(&"x".repeat(MAX_CONTENT_LEN + 1)).is_err());
    }

    #[test]
    fn resolve_slug_prefers_explicit() {
        let input = NewPage {
            title: "Acme S.r.l.".into(),
            slug: Some("acme".into()),
            page_type: PageType::Company,
        };
        assert_eq!(resolve_slug(&input).unwrap(), "acme");

        let derived = NewPage { slug: None, ..input };
        assert_eq!(resolve_slug(&derived).unwrap(), "acme-s-r-l");
    }

    #[test]
    fn resolve_slug_rejects_unsluggable_title() {
        let input = NewPage {
            title: "???".into(),
            slug: None,
            page_type: PageType::Wiki,
        };
        assert!(matches!(resolve_slug(&input), Err(CoreError::Validation(_))));
    }
}
