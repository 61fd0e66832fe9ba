//! Search documents, the text-index capability, and result types.
//!
//! The text index is a relevance oracle only. It returns ranked keys and
//! fragments; [`SearchSync`] resolves keys back to live pages.

pub mod query;
pub mod sync;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CoreError;
use crate::page::{Page, PageType};

pub use query::{tokenize, Occur, ParsedQuery, QueryClause};
pub use sync::{ReindexReport, SearchSync};

// ---------------------------------------------------------------------------
// Field names
// ---------------------------------------------------------------------------

pub const FIELD_NAME: &str = "name";
pub const FIELD_CONTENT: &str = "content";
pub const FIELD_CATEGORY: &str = "category";
pub const FIELD_CITY: &str = "city";
pub const FIELD_SECTOR: &str = "sector";
pub const FIELD_SHORT: &str = "short";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_SKILLS: &str = "skills";
pub const FIELD_TAGS: &str = "tags";

/// Fields matched as whole values rather than analyzed text.
pub const KEYWORD_FIELDS: &[&str] = &[FIELD_CATEGORY, FIELD_CITY, FIELD_SECTOR];

/// Fields faceted on every page search.
pub const FACET_FIELDS: &[&str] = &[FIELD_CATEGORY, FIELD_CITY, FIELD_SECTOR];

/// Fields highlighted on every page search.
pub const HIGHLIGHT_FIELDS: &[&str] = &[
    FIELD_SECTOR,
    FIELD_SHORT,
    FIELD_SKILLS,
    FIELD_TAGS,
    FIELD_DESCRIPTION,
];

pub fn is_keyword_field(field: &str) -> bool {
    KEYWORD_FIELDS.contains(&field)
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Default number of search results.
pub const DEFAULT_SEARCH_LIMIT: i64 = 20;

/// Maximum number of search results.
pub const MAX_SEARCH_LIMIT: i64 = 100;

/// Number of values returned per facet.
pub const FACET_SIZE: usize = 10;

/// Clamp a user-provided limit to valid bounds.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// The searchable projection of a page. May lag behind the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchDocument {
    pub name: String,
    pub category: String,
    pub city: Option<String>,
    pub sector: Option<String>,
    /// Approved content with header markup removed.
    pub content: String,
    /// Remaining parsed sections (`short`, `skills`, data entries, ...).
    pub sections: BTreeMap<String, String>,
}

impl SearchDocument {
    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            FIELD_NAME => Some(self.name.as_str()),
            FIELD_CATEGORY => Some(self.category.as_str()),
            FIELD_CITY => self.city.as_deref(),
            FIELD_SECTOR => self.sector.as_deref(),
            FIELD_CONTENT => Some(self.content.as_str()),
            other => self.sections.get(other).map(String::as_str),
        }
    }

    /// Every `(field, value)` pair of the document.
    pub fn fields(&self) -> Vec<(&str, &str)> {
        let mut fields = vec![
            (FIELD_NAME, self.name.as_str()),
            (FIELD_CATEGORY, self.category.as_str()),
            (FIELD_CONTENT, self.content.as_str()),
        ];
        if let Some(city) = &self.city {
            fields.push((FIELD_CITY, city));
        }
        if let Some(sector) = &self.sector {
            fields.push((FIELD_SECTOR, sector));
        }
        fields.extend(self.sections.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        fields
    }
}

// ---------------------------------------------------------------------------
// Requests and responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetRequest {
    pub field: String,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: ParsedQuery,
    pub limit: usize,
    pub facets: Vec<FacetRequest>,
    pub highlight_fields: Vec<String>,
}

impl SearchRequest {
    /// The standard page search: category/city/sector facets and the usual
    /// highlight fields.
    pub fn for_pages(query: ParsedQuery, limit: usize) -> Self {
        Self {
            query,
            limit,
            facets: FACET_FIELDS
                .iter()
                .map(|f| FacetRequest {
                    field: (*f).to_string(),
                    size: FACET_SIZE,
                })
                .collect(),
            highlight_fields: HIGHLIGHT_FIELDS.iter().map(|f| (*f).to_string()).collect(),
        }
    }
}

/// Highlighted snippets, keyed by field.
pub type Fragments = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub key: String,
    pub score: f64,
    pub fragments: Fragments,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetCount {
    pub value: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResponse {
    /// Best first.
    pub hits: Vec<SearchHit>,
    /// Number of matching documents, before `limit`.
    pub total: i64,
    pub facets: BTreeMap<String, Vec<FacetCount>>,
}

/// A resolved hit: the live page plus the index's fragments.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub page: Page,
    pub score: f64,
    pub fragments: Fragments,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub results: Vec<SearchResult>,
    /// Matches in the index, less the hits that did not resolve to a page.
    pub total: i64,
    /// Value counts as reported by the index.
    pub facets: BTreeMap<String, Vec<FacetCount>>,
}

impl SearchResults {
    /// Split results by page type, keeping relevance order within each.
    pub fn by_type(&self) -> BTreeMap<PageType, Vec<&SearchResult>> {
        let mut grouped: BTreeMap<PageType, Vec<&SearchResult>> = BTreeMap::new();
        for result in &self.results {
            grouped.entry(result.page.page_type).or_default().push(result);
        }
        grouped
    }
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// An external full-text index.
#[async_trait]
pub trait TextIndex: Send + Sync {
    /// Insert or replace the document stored under `key`.
    async fn upsert(&self, key: &str, document: &SearchDocument) -> Result<(), CoreError>;

    /// Remove every document.
    async fn clear(&self) -> Result<(), CoreError>;

    async fn query(&self, request: &SearchRequest) -> Result<SearchResponse, CoreError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> SearchDocument {
        SearchDocument {
            name: "Acme".into(),
            category: "companies".into(),
            city: Some("Rome".into()),
            sector: None,
            content: "Acme builds things".into(),
            sections: BTreeMap::from([("skills".to_string(), "welding".to_string())]),
        }
    }

    #[test]
    fn field_lookup() {
        let doc = document();
        assert_eq!(doc.field("name"), Some("Acme"));
        assert_eq!(doc.field("city"), Some("Rome"));
        assert_eq!(doc.field("sector"), None);
        assert_eq!(doc.field("skills"), Some("welding"));
        assert_eq!(doc.field("tags"), None);
    }

    #[test]
    fn fields_skip_missing_values() {
        let doc = document();
        let names: Vec<&str> = doc.fields().into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["name", "category", "content", "city", "skills"]);
    }

    #[test]
    fn clamp_limit_bounds() {
        assert_eq!(clamp_limit(None, 20, 100), 20);
        assert_eq!(clamp_limit(Some(0), 20, 100), 1);
        assert_eq!(clamp_limit(Some(500), 20, 100), 100);
    }

    #[test]
    fn page_request_has_standard_facets() {
        let request = SearchRequest::for_pages(ParsedQuery::parse("rust"), 20);
        let facets: Vec<&str> = request.facets.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(facets, vec!["category", "city", "sector"]);
        assert!(request.highlight_fields.contains(&"skills".to_string()));
    }
}
