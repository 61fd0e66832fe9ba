//! Page rows.

use agora_core::error::CoreError;
use agora_core::page::{Page, PageFields, PageType};
use agora_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `pages` table.
#[derive(Debug, Clone, FromRow)]
pub struct PageRow {
    pub id: DbId,
    pub title: String,
    pub slug: String,
    pub page_type: i16,
    pub owner_id: Option<DbId>,
    pub approved_content: String,
    pub approved_version_id: Option<DbId>,
    pub short: Option<String>,
    pub city: Option<String>,
    pub website: Option<String>,
    pub sector: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<PageRow> for Page {
    type Error = CoreError;

    fn try_from(row: PageRow) -> Result<Self, Self::Error> {
        let page_type = PageType::from_code(row.page_type).ok_or_else(|| {
            CoreError::Internal(format!(
                "Page {} has unknown page_type {}",
                row.id, row.page_type
            ))
        })?;
        Ok(Page {
            id: row.id,
            title: row.title,
            slug: row.slug,
            page_type,
            owner_id: row.owner_id,
            approved_content: row.approved_content,
            approved_version_id: row.approved_version_id,
            fields: PageFields {
                short: row.short,
                city: row.city,
                website: row.website,
                sector: row.sector,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Number of listed pages of one type.
#[derive(Debug, Clone, FromRow)]
pub struct TypeCountRow {
    pub page_type: i16,
    pub count: i64,
}
