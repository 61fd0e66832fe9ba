//! The directory facade: moderation plus index synchronization plus public
//! reads, wired over one set of stores.

use std::sync::Arc;

use crate::content_parser::ParserConfig;
use crate::error::CoreError;
use crate::moderation::{ModerationEngine, SubmitError, SubmitTarget, Submitted};
use crate::page::{Page, PageType, SiteStats};
use crate::roles::Actor;
use crate::search::{SearchResults, SearchSync, TextIndex};
use crate::store::{PageStore, RevisionStore};
use crate::types::DbId;

/// A stored submission together with the outcome of reindexing it.
#[derive(Debug)]
pub struct Published {
    pub submitted: Submitted,
    /// Set when the page changed but its search document could not be
    /// written. The page stays correct; a reindex repairs the index.
    pub index_error: Option<CoreError>,
}

/// Entry point for embedders.
#[derive(Clone)]
pub struct Directory {
    pages: Arc<dyn PageStore>,
    engine: ModerationEngine,
    sync: SearchSync,
}

impl Directory {
    pub fn new(
        pages: Arc<dyn PageStore>,
        revisions: Arc<dyn RevisionStore>,
        index: Arc<dyn TextIndex>,
        parser: ParserConfig,
    ) -> Self {
        let parser = Arc::new(parser);
        Self {
            engine: ModerationEngine::new(pages.clone(), revisions, parser.clone()),
            sync: SearchSync::new(pages.clone(), index, parser),
            pages,
        }
    }

    pub fn engine(&self) -> &ModerationEngine {
        &self.engine
    }

    pub fn search_sync(&self) -> &SearchSync {
        &self.sync
    }

    /// Submit a revision and reindex the page when it was approved.
    pub async fn submit(
        &self,
        target: SubmitTarget,
        content: &str,
        actor: &Actor,
    ) -> Result<Published, SubmitError> {
        let submitted = self.engine.submit(target, content, actor).await?;
        let index_error = if submitted.approved {
            self.reindex(&submitted.page).await
        } else {
            None
        };
        Ok(Published {
            submitted,
            index_error,
        })
    }

    /// Approve a pending revision and reindex the page.
    pub async fn approve(
        &self,
        page_id: DbId,
        revision_id: DbId,
        actor: &Actor,
    ) -> Result<(Page, Option<CoreError>), CoreError> {
        let page = self.engine.approve(page_id, revision_id, actor).await?;
        let index_error = self.reindex(&page).await;
        Ok((page, index_error))
    }

    async fn reindex(&self, page: &Page) -> Option<CoreError> {
        match self.sync.index_page(page).await {
            Ok(()) => None,
            Err(e) => {
                tracing::error!(page_id = page.id, error = %e, "Failed to index page");
                Some(e)
            }
        }
    }

    /// Listed pages of one type, ordered by title.
    pub async fn list_pages(&self, page_type: PageType) -> Result<Vec<Page>, CoreError> {
        self.pages.list_approved_by_type(page_type).await
    }

    /// A page by id, provided it is of the expected type.
    pub async fn find_page(&self, id: DbId, page_type: PageType) -> Result<Page, CoreError> {
        match self.pages.find_page(id).await? {
            Some(page) if page.page_type == page_type => Ok(page),
            _ => Err(CoreError::NotFound { entity: "page", id }),
        }
    }

    /// The actor's own professional page.
    pub async fn profile_page(&self, actor: &Actor) -> Result<Option<Page>, CoreError> {
        self.pages.find_profile_page(actor.id).await
    }

    pub async fn site_stats(&self) -> Result<SiteStats, CoreError> {
        self.pages.count_approved_by_type().await
    }

    pub async fn search(&self, query: &str) -> Result<SearchResults, CoreError> {
        self.sync.search(query).await
    }
}
