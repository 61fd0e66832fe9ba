//! Keeps the text index in step with the primary store and resolves search
//! hits back to live pages.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::content_parser::{strip_markup, ParserConfig};
use crate::error::CoreError;
use crate::page::Page;
use crate::search::{
    clamp_limit, ParsedQuery, SearchDocument, SearchRequest, SearchResult, SearchResults,
    TextIndex, DEFAULT_SEARCH_LIMIT, FIELD_CATEGORY, FIELD_CITY, FIELD_CONTENT, FIELD_NAME,
    FIELD_SECTOR, MAX_SEARCH_LIMIT,
};
use crate::store::PageStore;
use crate::types::DbId;

/// Outcome of a bulk reindex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
    pub indexed: usize,
    /// Never-approved pages, which are not searchable.
    pub skipped: usize,
    pub failed: usize,
}

/// Projects pages into the text index and reconciles hits with the store.
///
/// Holds no durable state; [`SearchSync::rebuild`] restores the index from
/// the primary store.
#[derive(Clone)]
pub struct SearchSync {
    pages: Arc<dyn PageStore>,
    index: Arc<dyn TextIndex>,
    parser: Arc<ParserConfig>,
}

impl SearchSync {
    pub fn new(
        pages: Arc<dyn PageStore>,
        index: Arc<dyn TextIndex>,
        parser: Arc<ParserConfig>,
    ) -> Self {
        Self {
            pages,
            index,
            parser,
        }
    }

    /// The search document for a page's approved content.
    pub fn document_for(&self, page: &Page) -> SearchDocument {
        let mut sections = self.parser.parse(&page.approved_content, page.page_type);
        for key in [FIELD_NAME, FIELD_CATEGORY, FIELD_CONTENT, FIELD_CITY, FIELD_SECTOR] {
            sections.remove(key);
        }
        SearchDocument {
            name: page.title.clone(),
            category: page.page_type.url_segment().to_string(),
            city: page.fields.city.clone(),
            sector: page.fields.sector.clone(),
            content: strip_markup(&page.approved_content),
            sections,
        }
    }

    /// Upsert the page's document under its id.
    pub async fn index_page(&self, page: &Page) -> Result<(), CoreError> {
        let document = self.document_for(page);
        self.index.upsert(&page.id.to_string(), &document).await?;
        tracing::debug!(page_id = page.id, "Page indexed");
        Ok(())
    }

    /// Index every approved page. Per-page failures are logged and counted.
    pub async fn reindex_all(&self) -> Result<ReindexReport, CoreError> {
        let pages = self.pages.list_pages().await?;
        let mut report = ReindexReport::default();

        for page in &pages {
            if !page.is_listed() {
                report.skipped += 1;
                continue;
            }
            match self.index_page(page).await {
                Ok(()) => report.indexed += 1,
                Err(e) => {
                    tracing::warn!(page_id = page.id, error = %e, "Failed to index page");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            indexed = report.indexed,
            skipped = report.skipped,
            failed = report.failed,
            "Reindex finished"
        );
        Ok(report)
    }

    /// Drop every indexed document, then reindex from the primary store.
    pub async fn rebuild(&self) -> Result<ReindexReport, CoreError> {
        self.index.clear().await?;
        self.reindex_all().await
    }

    pub async fn search(&self, query: &str) -> Result<SearchResults, CoreError> {
        self.search_with_limit(query, None).await
    }

    /// Query the index and resolve each hit against the primary store.
    ///
    /// Hits whose page no longer exists, or is not approved, are dropped and
    /// taken off `total`. Facets are counted by the index and may still
    /// include them. Returned pages always carry live content, whatever the
    /// index holds.
    pub async fn search_with_limit(
        &self,
        query: &str,
        limit: Option<i64>,
    ) -> Result<SearchResults, CoreError> {
        let parsed = ParsedQuery::parse(query);
        if parsed.is_empty() {
            return Ok(SearchResults::default());
        }

        let limit = clamp_limit(limit, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT) as usize;
        let request = SearchRequest::for_pages(parsed, limit);

        let pages: HashMap<DbId, Page> = self
            .pages
            .list_pages()
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let response = self.index.query(&request).await?;

        let mut results = Vec::with_capacity(response.hits.len());
        let mut dropped: i64 = 0;
        for hit in response.hits {
            let page = hit.key.parse::<DbId>().ok().and_then(|id| pages.get(&id));
            match page {
                Some(page) if page.is_listed() => results.push(SearchResult {
                    page: page.clone(),
                    score: hit.score,
                    fragments: hit.fragments,
                }),
                Some(_) => {
                    tracing::debug!(key = %hit.key, "Dropping hit for unapproved page");
                    dropped += 1;
                }
                None => {
                    tracing::warn!(key = %hit.key, "Search hit does not resolve to a page");
                    dropped += 1;
                }
            }
        }

        Ok(SearchResults {
            results,
            total: (response.total - dropped).max(0),
            facets: response.facets,
        })
    }
}
