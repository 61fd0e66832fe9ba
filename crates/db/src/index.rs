//! A named full-text index stored in Postgres.

use agora_core::error::CoreError;
use agora_core::search::{
    Fragments, SearchDocument, SearchHit, SearchRequest, SearchResponse, TextIndex,
};
use async_trait::async_trait;

use crate::repositories::SearchRepo;
use crate::store::storage_error;
use crate::DbPool;

/// A [`TextIndex`] over the `search_documents` rows of one index name.
#[derive(Debug, Clone)]
pub struct PgTextIndex {
    pool: DbPool,
    name: String,
}

impl PgTextIndex {
    /// Open the index called `name`, registering it on first use.
    pub async fn open_or_create(pool: DbPool, name: &str) -> Result<Self, CoreError> {
        SearchRepo::register_index(&pool, name)
            .await
            .map_err(storage_error)?;
        tracing::debug!(index = name, "Search index opened");
        Ok(Self {
            pool,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every stored document with its key, ordered by key.
    pub async fn documents(&self) -> Result<Vec<(String, SearchDocument)>, CoreError> {
        let rows = SearchRepo::list(&self.pool, &self.name)
            .await
            .map_err(storage_error)?;
        Ok(rows
            .into_iter()
            .map(|row| (row.doc_key.clone(), SearchDocument::from(row)))
            .collect())
    }
}

#[async_trait]
impl TextIndex for PgTextIndex {
    async fn upsert(&self, key: &str, document: &SearchDocument) -> Result<(), CoreError> {
        SearchRepo::upsert(&self.pool, &self.name, key, document)
            .await
            .map_err(storage_error)
    }

    async fn clear(&self) -> Result<(), CoreError> {
        let removed = SearchRepo::clear(&self.pool, &self.name)
            .await
            .map_err(storage_error)?;
        tracing::info!(index = %self.name, removed, "Search index cleared");
        Ok(())
    }

    async fn query(&self, request: &SearchRequest) -> Result<SearchResponse, CoreError> {
        let rows = SearchRepo::search_hits(&self.pool, &self.name, request)
            .await
            .map_err(storage_error)?;
        let total = SearchRepo::count(&self.pool, &self.name, &request.query)
            .await
            .map_err(storage_error)?;

        let mut response = SearchResponse {
            total,
            ..SearchResponse::default()
        };
        for facet in &request.facets {
            let rows =
                SearchRepo::facet(&self.pool, &self.name, &request.query, &facet.field, facet.size)
                    .await
                    .map_err(storage_error)?;
            response
                .facets
                .insert(facet.field.clone(), rows.into_iter().map(Into::into).collect());
        }

        response.hits = rows
            .into_iter()
            .map(|row| {
                let mut fragments = Fragments::new();
                for (field, highlight) in request.highlight_fields.iter().zip(row.highlights) {
                    if let Some(h) = highlight {
                        fragments.insert(field.clone(), vec![h]);
                    }
                }
                SearchHit {
                    key: row.doc_key,
                    score: row.score,
                    fragments,
                }
            })
            .collect();
        Ok(response)
    }
}
