//! Full-text index rows.

use std::collections::BTreeMap;

use agora_core::search::{FacetCount, SearchDocument};
use agora_core::types::Timestamp;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `search_documents` table.
#[derive(Debug, Clone, FromRow)]
pub struct SearchDocumentRow {
    pub doc_key: String,
    pub name: String,
    pub category: String,
    pub city: Option<String>,
    pub sector: Option<String>,
    pub content: String,
    pub sections: Json<BTreeMap<String, String>>,
    pub updated_at: Timestamp,
}

impl From<SearchDocumentRow> for SearchDocument {
    fn from(row: SearchDocumentRow) -> Self {
        SearchDocument {
            name: row.name,
            category: row.category,
            city: row.city,
            sector: row.sector,
            content: row.content,
            sections: row.sections.0,
        }
    }
}

/// One bucket of a `GROUP BY` facet query.
#[derive(Debug, Clone, FromRow)]
pub struct FacetRow {
    pub value: String,
    pub count: i64,
}

impl From<FacetRow> for FacetCount {
    fn from(row: FacetRow) -> Self {
        FacetCount {
            value: row.value,
            count: row.count,
        }
    }
}

/// A ranked hit with one optional highlight per requested field.
#[derive(Debug, Clone)]
pub struct SearchHitRow {
    pub doc_key: String,
    pub score: f64,
    /// Parallel to the request's highlight fields.
    pub highlights: Vec<Option<String>>,
}
