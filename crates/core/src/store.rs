//! Primary-store capabilities consumed by the engine and the synchronizer.
//!
//! Implementations: [`crate::memory::MemoryStore`] in-process, and the
//! Postgres store in `agora-db`. Both report failures as
//! [`CoreError::Storage`], or [`CoreError::Conflict`] when a uniqueness
//! rule (slug, one profile per owner) is violated.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::page::{Approval, Page, PageType, SiteStats};
use crate::revision::{PendingRevision, Revision};
use crate::types::DbId;

#[async_trait]
pub trait PageStore: Send + Sync {
    /// Persist a page stub with no approved content.
    async fn insert_page(
        &self,
        title: &str,
        slug: &str,
        page_type: PageType,
        owner_id: Option<DbId>,
    ) -> Result<Page, CoreError>;

    async fn find_page(&self, id: DbId) -> Result<Option<Page>, CoreError>;

    async fn find_page_by_slug(&self, slug: &str) -> Result<Option<Page>, CoreError>;

    /// The professional page owned by `owner_id`, if any.
    async fn find_profile_page(&self, owner_id: DbId) -> Result<Option<Page>, CoreError>;

    /// Write an approval onto a page and return the updated row.
    async fn save_approval(&self, page_id: DbId, approval: &Approval)
        -> Result<Page, CoreError>;

    async fn list_pages(&self) -> Result<Vec<Page>, CoreError>;

    /// Approved pages of one type, ordered by title.
    async fn list_approved_by_type(&self, page_type: PageType) -> Result<Vec<Page>, CoreError>;

    async fn count_approved_by_type(&self) -> Result<SiteStats, CoreError>;
}

#[async_trait]
pub trait RevisionStore: Send + Sync {
    async fn insert_revision(
        &self,
        page_id: DbId,
        user_id: DbId,
        content: &str,
    ) -> Result<Revision, CoreError>;

    async fn find_revision(&self, id: DbId) -> Result<Option<Revision>, CoreError>;

    /// All revisions of a page, newest first.
    async fn list_for_page(&self, page_id: DbId) -> Result<Vec<Revision>, CoreError>;

    /// Revisions of a page with id greater than `after_id`, newest first.
    async fn list_pending_for_page(
        &self,
        page_id: DbId,
        after_id: DbId,
    ) -> Result<Vec<PendingRevision>, CoreError>;

    /// Every revision newer than its page's approved version, newest first.
    async fn list_all_pending(&self) -> Result<Vec<PendingRevision>, CoreError>;
}
