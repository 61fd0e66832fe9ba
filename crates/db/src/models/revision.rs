//! Revision rows and the pending-revision join.

use agora_core::revision::{PendingRevision, Revision};
use agora_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `revisions` table.
#[derive(Debug, Clone, FromRow)]
pub struct RevisionRow {
    pub id: DbId,
    pub page_id: DbId,
    pub user_id: DbId,
    pub content: String,
    pub created_at: Timestamp,
}

impl From<RevisionRow> for Revision {
    fn from(row: RevisionRow) -> Self {
        Revision {
            id: row.id,
            page_id: row.page_id,
            user_id: row.user_id,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

/// A revision joined with its page title and author name.
#[derive(Debug, Clone, FromRow)]
pub struct PendingRevisionRow {
    pub id: DbId,
    pub page_id: DbId,
    pub user_id: DbId,
    pub content: String,
    pub created_at: Timestamp,
    pub page_title: String,
    pub author_name: Option<String>,
}

impl From<PendingRevisionRow> for PendingRevision {
    fn from(row: PendingRevisionRow) -> Self {
        PendingRevision {
            revision: Revision {
                id: row.id,
                page_id: row.page_id,
                user_id: row.user_id,
                content: row.content,
                created_at: row.created_at,
            },
            page_title: row.page_title,
            author_name: row.author_name,
        }
    }
}
