//! Repository for the `pages` table.

use agora_core::page::Approval;
use agora_core::types::DbId;
use sqlx::PgPool;

use crate::models::page::{PageRow, TypeCountRow};

/// Column list for pages queries.
const COLUMNS: &str = "id, title, slug, page_type, owner_id, approved_content, \
    approved_version_id, short, city, website, sector, created_at, updated_at";

/// Provides storage operations for pages.
pub struct PageRepo;

impl PageRepo {
    /// Insert a page stub with no approved content.
    pub async fn create(
        pool: &PgPool,
        title: &str,
        slug: &str,
        page_type: i16,
        owner_id: Option<DbId>,
    ) -> Result<PageRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO pages (title, slug, page_type, owner_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PageRow>(&query)
            .bind(title)
            .bind(slug)
            .bind(page_type)
            .bind(owner_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<PageRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pages WHERE id = $1");
        sqlx::query_as::<_, PageRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<PageRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pages WHERE slug = $1");
        sqlx::query_as::<_, PageRow>(&query)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// The professional page (type 0) owned by `owner_id`.
    pub async fn find_profile(
        pool: &PgPool,
        owner_id: DbId,
    ) -> Result<Option<PageRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pages WHERE owner_id = $1 AND page_type = 0");
        sqlx::query_as::<_, PageRow>(&query)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// Write the approved content and derived fields in one statement.
    pub async fn save_approval(
        pool: &PgPool,
        page_id: DbId,
        approval: &Approval,
    ) -> Result<Option<PageRow>, sqlx::Error> {
        let query = format!(
            "UPDATE pages SET
                approved_content = $2,
                approved_version_id = $3,
                short = $4,
                city = $5,
                website = $6,
                sector = $7,
                updated_at = now()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PageRow>(&query)
            .bind(page_id)
            .bind(&approval.content)
            .bind(approval.version_id)
            .bind(&approval.fields.short)
            .bind(&approval.fields.city)
            .bind(&approval.fields.website)
            .bind(&approval.fields.sector)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<PageRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pages ORDER BY id");
        sqlx::query_as::<_, PageRow>(&query).fetch_all(pool).await
    }

    /// Approved pages of one type, ordered by title.
    pub async fn list_approved_by_type(
        pool: &PgPool,
        page_type: i16,
    ) -> Result<Vec<PageRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM pages
             WHERE page_type = $1 AND approved_version_id IS NOT NULL
             ORDER BY title ASC"
        );
        sqlx::query_as::<_, PageRow>(&query)
            .bind(page_type)
            .fetch_all(pool)
            .await
    }

    pub async fn count_approved_by_type(pool: &PgPool) -> Result<Vec<TypeCountRow>, sqlx::Error> {
        sqlx::query_as::<_, TypeCountRow>(
            "SELECT page_type, COUNT(*) AS count FROM pages
             WHERE approved_version_id IS NOT NULL
             GROUP BY page_type",
        )
        .fetch_all(pool)
        .await
    }
}
