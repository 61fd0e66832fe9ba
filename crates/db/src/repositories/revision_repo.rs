//! Repository for the `revisions` table.

use agora_core::types::DbId;
use sqlx::PgPool;

use crate::models::revision::{PendingRevisionRow, RevisionRow};

/// Column list for revisions queries.
const COLUMNS: &str = "id, page_id, user_id, content, created_at";

/// Revision columns joined with page title and author name.
const PENDING_COLUMNS: &str = "r.id, r.page_id, r.user_id, r.content, r.created_at, \
    p.title AS page_title, u.username AS author_name";

/// Provides append-only storage for revisions.
pub struct RevisionRepo;

impl RevisionRepo {
    pub async fn create(
        pool: &PgPool,
        page_id: DbId,
        user_id: DbId,
        content: &str,
    ) -> Result<RevisionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO revisions (page_id, user_id, content)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RevisionRow>(&query)
            .bind(page_id)
            .bind(user_id)
            .bind(content)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<RevisionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM revisions WHERE id = $1");
        sqlx::query_as::<_, RevisionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All revisions of a page, newest first.
    pub async fn list_for_page(
        pool: &PgPool,
        page_id: DbId,
    ) -> Result<Vec<RevisionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM revisions WHERE page_id = $1 ORDER BY id DESC"
        );
        sqlx::query_as::<_, RevisionRow>(&query)
            .bind(page_id)
            .fetch_all(pool)
            .await
    }

    /// Revisions of a page newer than `after_id`, newest first.
    pub async fn list_pending_for_page(
        pool: &PgPool,
        page_id: DbId,
        after_id: DbId,
    ) -> Result<Vec<PendingRevisionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {PENDING_COLUMNS}
             FROM revisions r
             JOIN pages p ON p.id = r.page_id
             LEFT JOIN users u ON u.id = r.user_id
             WHERE r.page_id = $1 AND r.id > $2
             ORDER BY r.id DESC"
        );
        sqlx::query_as::<_, PendingRevisionRow>(&query)
            .bind(page_id)
            .bind(after_id)
            .fetch_all(pool)
            .await
    }

    /// Every revision newer than its page's approved version, newest first.
    pub async fn list_all_pending(pool: &PgPool) -> Result<Vec<PendingRevisionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {PENDING_COLUMNS}
             FROM revisions r
             JOIN pages p ON p.id = r.page_id
             LEFT JOIN users u ON u.id = r.user_id
             WHERE r.id > COALESCE(p.approved_version_id, 0)
             ORDER BY r.id DESC"
        );
        sqlx::query_as::<_, PendingRevisionRow>(&query)
            .fetch_all(pool)
            .await
    }
}
