//! Postgres implementations of the core store capabilities.

use agora_core::error::CoreError;
use agora_core::page::{Approval, Page, PageType, SiteStats};
use agora_core::revision::{PendingRevision, Revision};
use agora_core::store::{PageStore, RevisionStore};
use agora_core::types::DbId;
use async_trait::async_trait;

use crate::repositories::{PageRepo, RevisionRepo};
use crate::DbPool;

/// Map a sqlx error onto the core error taxonomy.
///
/// Unique violations on `uq_` constraints become [`CoreError::Conflict`];
/// everything else is logged and reported as [`CoreError::Storage`].
pub(crate) fn storage_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db_err) = &err {
        // PostgreSQL unique constraint violation: error code 23505
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or("unknown");
            if constraint.starts_with("uq_") {
                return CoreError::Conflict(format!(
                    "Duplicate value violates unique constraint: {constraint}"
                ));
            }
        }
    }
    tracing::error!(error = %err, "Database error");
    CoreError::Storage(err.to_string())
}

/// Pages and revisions in Postgres.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PageStore for PgStore {
    async fn insert_page(
        &self,
        title: &str,
        slug: &str,
        page_type: PageType,
        owner_id: Option<DbId>,
    ) -> Result<Page, CoreError> {
        PageRepo::create(&self.pool, title, slug, page_type.code(), owner_id)
            .await
            .map_err(storage_error)?
            .try_into()
    }

    async fn find_page(&self, id: DbId) -> Result<Option<Page>, CoreError> {
        PageRepo::find_by_id(&self.pool, id)
            .await
            .map_err(storage_error)?
            .map(Page::try_from)
            .transpose()
    }

    async fn find_page_by_slug(&self, slug: &str) -> Result<Option<Page>, CoreError> {
        PageRepo::find_by_slug(&self.pool, slug)
            .await
            .map_err(storage_error)?
            .map(Page::try_from)
            .transpose()
    }

    async fn find_profile_page(&self, owner_id: DbId) -> Result<Option<Page>, CoreError> {
        PageRepo::find_profile(&self.pool, owner_id)
            .await
            .map_err(storage_error)?
            .map(Page::try_from)
            .transpose()
    }

    async fn save_approval(
        &self,
        page_id: DbId,
        approval: &Approval,
    ) -> Result<Page, CoreError> {
        PageRepo::save_approval(&self.pool, page_id, approval)
            .await
            .map_err(storage_error)?
            .ok_or(CoreError::NotFound {
                entity: "page",
                id: page_id,
            })?
            .try_into()
    }

    async fn list_pages(&self) -> Result<Vec<Page>, CoreError> {
        PageRepo::list(&self.pool)
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(Page::try_from)
            .collect()
    }

    async fn list_approved_by_type(&self, page_type: PageType) -> Result<Vec<Page>, CoreError> {
        PageRepo::list_approved_by_type(&self.pool, page_type.code())
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(Page::try_from)
            .collect()
    }

    async fn count_approved_by_type(&self) -> Result<SiteStats, CoreError> {
        let rows = PageRepo::count_approved_by_type(&self.pool)
            .await
            .map_err(storage_error)?;
        let mut stats = SiteStats::default();
        for row in rows {
            match PageType::from_code(row.page_type) {
                Some(page_type) => stats.add(page_type, row.count),
                None => tracing::warn!(page_type = row.page_type, "Skipping unknown page type"),
            }
        }
        Ok(stats)
    }
}

#[async_trait]
impl RevisionStore for PgStore {
    async fn insert_revision(
        &self,
        page_id: DbId,
        user_id: DbId,
        content: &str,
    ) -> Result<Revision, CoreError> {
        RevisionRepo::create(&self.pool, page_id, user_id, content)
            .await
            .map(Revision::from)
            .map_err(storage_error)
    }

    async fn find_revision(&self, id: DbId) -> Result<Option<Revision>, CoreError> {
        RevisionRepo::find_by_id(&self.pool, id)
            .await
            .map(|row| row.map(Revision::from))
            .map_err(storage_error)
    }

    async fn list_for_page(&self, page_id: DbId) -> Result<Vec<Revision>, CoreError> {
        RevisionRepo::list_for_page(&self.pool, page_id)
            .await
            .map(|rows| rows.into_iter().map(Revision::from).collect())
            .map_err(storage_error)
    }

    async fn list_pending_for_page(
        &self,
        page_id: DbId,
        after_id: DbId,
    ) -> Result<Vec<PendingRevision>, CoreError> {
        RevisionRepo::list_pending_for_page(&self.pool, page_id, after_id)
            .await
            .map(|rows| rows.into_iter().map(PendingRevision::from).collect())
            .map_err(storage_error)
    }

    async fn list_all_pending(&self) -> Result<Vec<PendingRevision>, CoreError> {
        RevisionRepo::list_all_pending(&self.pool)
            .await
            .map(|rows| rows.into_iter().map(PendingRevision::from).collect())
            .map_err(storage_error)
    }
}
