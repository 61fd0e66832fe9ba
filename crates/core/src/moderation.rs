//! Revision moderation: who may edit a page, who may approve, and how a
//! submission becomes (or does not become) the visible content.

use std::sync::Arc;

use crate::content_parser::ParserConfig;
use crate::error::CoreError;
use crate::page::{resolve_slug, validate_content, Approval, NewPage, Page, PageType};
use crate::revision::{PendingRevision, Revision};
use crate::roles::Actor;
use crate::store::{PageStore, RevisionStore};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

/// Admins edit anything; anyone edits an ownerless page; owners edit theirs.
pub fn can_edit(page: &Page, actor: &Actor) -> bool {
    actor.is_admin() || page.owner_id.is_none() || page.owner_id == Some(actor.id)
}

/// Only admins and the page's owner approve. Ownerless pages need an admin.
pub fn can_approve_edits(page: &Page, actor: &Actor) -> bool {
    actor.is_admin() || page.owner_id == Some(actor.id)
}

// ---------------------------------------------------------------------------
// Submission types
// ---------------------------------------------------------------------------

/// The page a submission is aimed at.
#[derive(Debug, Clone)]
pub enum SubmitTarget {
    Existing(DbId),
    New(NewPage),
}

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub struct Submitted {
    /// The page as it now stands.
    pub page: Page,
    pub revision: Revision,
    /// Whether the revision became the page's visible content.
    pub approved: bool,
}

/// Why a submission failed, and what was written before it did.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// Validation, authorization or lookup failure. Nothing was written.
    #[error(transparent)]
    Rejected(#[from] CoreError),

    /// The revision was not stored. `page` is the target page, including a
    /// stub created by this submission; resubmit against it. `None` when the
    /// stub itself could not be created.
    #[error("Revision was not persisted: {source}")]
    RevisionNotPersisted {
        page: Option<Box<Page>>,
        #[source]
        source: CoreError,
    },

    /// The revision was stored but the page was not updated. Retry with
    /// [`ModerationEngine::approve`].
    #[error("Revision {} was persisted but page {} was not updated: {source}", revision.id, revision.page_id)]
    PageNotUpdated {
        revision: Box<Revision>,
        #[source]
        source: CoreError,
    },
}

/// What the editor should show for a page.
#[derive(Debug, Clone)]
pub struct EditorView {
    pub page: Page,
    /// Newest first.
    pub pending: Vec<PendingRevision>,
    /// The newest pending revision's content, or the approved content.
    pub shown_content: String,
    /// The revision `shown_content` comes from, when it is a pending one.
    pub shown_revision: Option<PendingRevision>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Decides what happens to each submission.
///
/// Holds no state of its own; the stores are injected at construction.
#[derive(Clone)]
pub struct ModerationEngine {
    pages: Arc<dyn PageStore>,
    revisions: Arc<dyn RevisionStore>,
    parser: Arc<ParserConfig>,
}

impl ModerationEngine {
    pub fn new(
        pages: Arc<dyn PageStore>,
        revisions: Arc<dyn RevisionStore>,
        parser: Arc<ParserConfig>,
    ) -> Self {
        Self {
            pages,
            revisions,
            parser,
        }
    }

    /// Record a submission and approve it when the submitter may do so.
    ///
    /// Validation and authorization run before anything is written. The
    /// revision is always stored; the page's visible content changes only
    /// when [`can_approve_edits`] holds for the submitter.
    pub async fn submit(
        &self,
        target: SubmitTarget,
        content: &str,
        actor: &Actor,
    ) -> Result<Submitted, SubmitError> {
        validate_content(content)?;

        let page = match target {
            SubmitTarget::Existing(id) => {
                let page = self.load_page(id).await?;
                if !can_edit(&page, actor) {
                    return Err(CoreError::Forbidden(format!(
                        "User {} cannot edit page {}",
                        actor.id, page.id
                    ))
                    .into());
                }
                page
            }
            SubmitTarget::New(input) => self.create_stub(&input, actor).await?,
        };

        let revision = self
            .revisions
            .insert_revision(page.id, actor.id, content)
            .await
            .map_err(|source| {
                tracing::error!(page_id = page.id, error = %source, "Failed to store revision");
                SubmitError::RevisionNotPersisted {
                    page: Some(Box::new(page.clone())),
                    source,
                }
            })?;

        if !can_approve_edits(&page, actor) {
            tracing::info!(
                page_id = page.id,
                revision_id = revision.id,
                user_id = actor.id,
                "Revision awaiting moderation"
            );
            return Ok(Submitted {
                page,
                revision,
                approved: false,
            });
        }

        let page = match self.apply(&page, &revision).await {
            Ok(page) => page,
            Err(source) => {
                tracing::error!(
                    page_id = page.id,
                    revision_id = revision.id,
                    error = %source,
                    "Revision stored but page update failed"
                );
                return Err(SubmitError::PageNotUpdated {
                    revision: Box::new(revision),
                    source,
                });
            }
        };

        Ok(Submitted {
            page,
            revision,
            approved: true,
        })
    }

    /// Promote a pending revision of `page_id` to the visible content.
    pub async fn approve(
        &self,
        page_id: DbId,
        revision_id: DbId,
        actor: &Actor,
    ) -> Result<Page, CoreError> {
        let page = self.load_page(page_id).await?;
        if !can_approve_edits(&page, actor) {
            return Err(CoreError::Forbidden(format!(
                "User {} cannot approve edits to page {}",
                actor.id, page.id
            )));
        }

        let revision = self
            .revisions
            .find_revision(revision_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "revision",
                id: revision_id,
            })?;
        if revision.page_id != page.id {
            return Err(CoreError::Validation(format!(
                "Revision {} does not belong to page {}",
                revision.id, page.id
            )));
        }
        if !page.is_pending(revision.id) {
            return Err(CoreError::Validation(format!(
                "Revision {} is not pending for page {}",
                revision.id, page.id
            )));
        }

        self.apply(&page, &revision).await
    }

    /// Pending revisions of a page, newest first.
    pub async fn pending_for_page(&self, page: &Page) -> Result<Vec<PendingRevision>, CoreError> {
        self.revisions
            .list_pending_for_page(page.id, page.approved_version_id.unwrap_or(0))
            .await
    }

    /// Every revision in the system awaiting moderation.
    pub async fn pending_all(&self) -> Result<Vec<PendingRevision>, CoreError> {
        self.revisions.list_all_pending().await
    }

    /// All revisions of a page, newest first.
    pub async fn history(&self, page_id: DbId) -> Result<Vec<Revision>, CoreError> {
        self.load_page(page_id).await?;
        self.revisions.list_for_page(page_id).await
    }

    /// Load a page for editing, showing the newest pending revision if any.
    pub async fn editor_view(&self, page_id: DbId, actor: &Actor) -> Result<EditorView, CoreError> {
        let page = self.load_page(page_id).await?;
        if !can_edit(&page, actor) {
            return Err(CoreError::Forbidden(format!(
                "User {} cannot edit page {}",
                actor.id, page.id
            )));
        }

        let pending = self.pending_for_page(&page).await?;
        let shown_revision = pending.first().cloned();
        let shown_content = match &shown_revision {
            Some(p) => p.revision.content.clone(),
            None => page.approved_content.clone(),
        };

        Ok(EditorView {
            page,
            pending,
            shown_content,
            shown_revision,
        })
    }

    async fn load_page(&self, id: DbId) -> Result<Page, CoreError> {
        self.pages
            .find_page(id)
            .await?
            .ok_or(CoreError::NotFound { entity: "page", id })
    }

    /// Validate a new page and persist its stub so revisions can refer to it.
    async fn create_stub(&self, input: &NewPage, actor: &Actor) -> Result<Page, SubmitError> {
        let slug = resolve_slug(input)?;

        if self.pages.find_page_by_slug(&slug).await?.is_some() {
            return Err(CoreError::Validation(format!("Slug '{slug}' is already in use")).into());
        }

        let owner_id = match input.page_type {
            PageType::Professional => {
                if self.pages.find_profile_page(actor.id).await?.is_some() {
                    return Err(CoreError::Validation(format!(
                        "User {} already has a professional page",
                        actor.id
                    ))
                    .into());
                }
                Some(actor.id)
            }
            _ => None,
        };

        let page = self
            .pages
            .insert_page(&input.title, &slug, input.page_type, owner_id)
            .await
            .map_err(|source| SubmitError::RevisionNotPersisted { page: None, source })?;

        tracing::info!(
            page_id = page.id,
            slug = %page.slug,
            page_type = %page.page_type,
            "Page stub created"
        );
        Ok(page)
    }

    async fn apply(&self, page: &Page, revision: &Revision) -> Result<Page, CoreError> {
        let approval = Approval::new(&revision.content, revision.id, page.page_type, &self.parser);
        let page = self.pages.save_approval(page.id, &approval).await?;
        tracing::info!(
            page_id = page.id,
            revision_id = revision.id,
            "Revision approved"
        );
        Ok(page)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
