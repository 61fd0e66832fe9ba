//! Revisions: immutable snapshots of submitted page content.
//!
//! Revisions are append-only. A revision whose id is greater than its page's
//! approved version id is pending.

use serde::Serialize;

use crate::types::{DbId, Timestamp};

/// A stored submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Revision {
    pub id: DbId,
    pub page_id: DbId,
    pub user_id: DbId,
    pub content: String,
    pub created_at: Timestamp,
}

/// A pending revision together with what a moderator needs to review it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingRevision {
    #[serde(flatten)]
    pub revision: Revision,
    pub page_title: String,
    /// `None` when the author record no longer resolves.
    pub author_name: Option<String>,
}
