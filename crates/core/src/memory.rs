//! In-process implementations of the store and index capabilities.
//!
//! [`MemoryStore`] backs both [`PageStore`] and [`RevisionStore`];
//! [`MemoryIndex`] is a small scoring index over [`SearchDocument`]s. Both
//! are used by tests and by embedders that do not need Postgres.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::CoreError;
use crate::page::{Approval, Page, PageFields, PageType, SiteStats};
use crate::revision::{PendingRevision, Revision};
use crate::search::{
    is_keyword_field, tokenize, FacetCount, Fragments, Occur, QueryClause, SearchDocument,
    SearchHit, SearchRequest, SearchResponse, TextIndex, FIELD_NAME,
};
use crate::store::{PageStore, RevisionStore};
use crate::types::DbId;

fn poisoned() -> CoreError {
    CoreError::Internal("memory store lock poisoned".into())
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct StoreState {
    pages: BTreeMap<DbId, Page>,
    revisions: BTreeMap<DbId, Revision>,
    usernames: HashMap<DbId, String>,
    last_page_id: DbId,
    last_revision_id: DbId,
}

/// Pages and revisions held in memory.
///
/// Ids increase monotonically from 1. Enforces the same uniqueness rules as
/// the Postgres schema: one page per slug, one professional page per owner.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a username so pending revisions can name their author.
    #[must_use]
    pub fn with_user(self, id: DbId, username: impl Into<String>) -> Self {
        if let Ok(mut state) = self.state.write() {
            state.usernames.insert(id, username.into());
        }
        self
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>, CoreError> {
        self.state.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>, CoreError> {
        self.state.write().map_err(|_| poisoned())
    }
}

impl StoreState {
    fn pending(&self, revision: &Revision) -> Option<PendingRevision> {
        let page = self.pages.get(&revision.page_id)?;
        Some(PendingRevision {
            revision: revision.clone(),
            page_title: page.title.clone(),
            author_name: self.usernames.get(&revision.user_id).cloned(),
        })
    }
}

#[async_trait]
impl PageStore for MemoryStore {
    async fn insert_page(
        &self,
        title: &str,
        slug: &str,
        page_type: PageType,
        owner_id: Option<DbId>,
    ) -> Result<Page, CoreError> {
        let mut state = self.write()?;

        if state.pages.values().any(|p| p.slug == slug) {
            return Err(CoreError::Conflict(format!("Slug '{slug}' already exists")));
        }
        if page_type == PageType::Professional {
            if let Some(owner) = owner_id {
                if state
                    .pages
                    .values()
                    .any(|p| p.page_type == PageType::Professional && p.owner_id == Some(owner))
                {
                    return Err(CoreError::Conflict(format!(
                        "User {owner} already owns a professional page"
                    )));
                }
            }
        }

        state.last_page_id += 1;
        let now = chrono::Utc::now();
        let page = Page {
            id: state.last_page_id,
            title: title.to_string(),
            slug: slug.to_string(),
            page_type,
            owner_id,
            approved_content: String::new(),
            approved_version_id: None,
            fields: PageFields::default(),
            created_at: now,
            updated_at: now,
        };
        state.pages.insert(page.id, page.clone());
        Ok(page)
    }

    async fn find_page(&self, id: DbId) -> Result<Option<Page>, CoreError> {
        Ok(self.read()?.pages.get(&id).cloned())
    }

    async fn find_page_by_slug(&self, slug: &str) -> Result<Option<Page>, CoreError> {
        Ok(self.read()?.pages.values().find(|p| p.slug == slug).cloned())
    }

    async fn find_profile_page(&self, owner_id: DbId) -> Result<Option<Page>, CoreError> {
        Ok(self
            .read()?
            .pages
            .values()
            .find(|p| p.page_type == PageType::Professional && p.owner_id == Some(owner_id))
            .cloned())
    }

    async fn save_approval(
        &self,
        page_id: DbId,
        approval: &Approval,
    ) -> Result<Page, CoreError> {
        let mut state = self.write()?;
        let page = state.pages.get_mut(&page_id).ok_or(CoreError::NotFound {
            entity: "page",
            id: page_id,
        })?;
        page.approved_content = approval.content.clone();
        page.approved_version_id = Some(approval.version_id);
        page.fields = approval.fields.clone();
        page.updated_at = chrono::Utc::now();
        Ok(page.clone())
    }

    async fn list_pages(&self) -> Result<Vec<Page>, CoreError> {
        Ok(self.read()?.pages.values().cloned().collect())
    }

    async fn list_approved_by_type(&self, page_type: PageType) -> Result<Vec<Page>, CoreError> {
        let mut pages: Vec<Page> = self
            .read()?
            .pages
            .values()
            .filter(|p| p.page_type == page_type && p.is_listed())
            .cloned()
            .collect();
        pages.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(pages)
    }

    async fn count_approved_by_type(&self) -> Result<SiteStats, CoreError> {
        let mut stats = SiteStats::default();
        for page in self.read()?.pages.values().filter(|p| p.is_listed()) {
            stats.add(page.page_type, 1);
        }
        Ok(stats)
    }
}

#[async_trait]
impl RevisionStore for MemoryStore {
    async fn insert_revision(
        &self,
        page_id: DbId,
        user_id: DbId,
        content: &str,
    ) -> Result<Revision, CoreError> {
        let mut state = self.write()?;
        if !state.pages.contains_key(&page_id) {
            return Err(CoreError::NotFound {
                entity: "page",
                id: page_id,
            });
        }
        state.last_revision_id += 1;
        let revision = Revision {
            id: state.last_revision_id,
            page_id,
            user_id,
            content: content.to_string(),
            created_at: chrono::Utc::now(),
        };
        state.revisions.insert(revision.id, revision.clone());
        Ok(revision)
    }

    async fn find_revision(&self, id: DbId) -> Result<Option<Revision>, CoreError> {
        Ok(self.read()?.revisions.get(&id).cloned())
    }

    async fn list_for_page(&self, page_id: DbId) -> Result<Vec<Revision>, CoreError> {
        Ok(self
            .read()?
            .revisions
            .values()
            .rev()
            .filter(|r| r.page_id == page_id)
            .cloned()
            .collect())
    }

    async fn list_pending_for_page(
        &self,
        page_id: DbId,
        after_id: DbId,
    ) -> Result<Vec<PendingRevision>, CoreError> {
        let state = self.read()?;
        Ok(state
            .revisions
            .values()
            .rev()
            .filter(|r| r.page_id == page_id && r.id > after_id)
            .filter_map(|r| state.pending(r))
            .collect())
    }

    async fn list_all_pending(&self) -> Result<Vec<PendingRevision>, CoreError> {
        let state = self.read()?;
        Ok(state
            .revisions
            .values()
            .rev()
            .filter(|r| {
                state
                    .pages
                    .get(&r.page_id)
                    .is_some_and(|p| p.is_pending(r.id))
            })
            .filter_map(|r| state.pending(r))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// MemoryIndex
// ---------------------------------------------------------------------------

/// Words of context kept before the first highlighted word.
const FRAGMENT_LEAD: usize = 5;

/// Maximum words per fragment.
const FRAGMENT_WORDS: usize = 24;

const NAME_BOOST: f64 = 2.0;

/// Search documents held in memory, scored by term occurrence.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    docs: RwLock<BTreeMap<String, SearchDocument>>,
}

impl MemoryIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored documents, keyed by document key.
    pub fn documents(&self) -> Result<BTreeMap<String, SearchDocument>, CoreError> {
        Ok(self.docs.read().map_err(|_| poisoned())?.clone())
    }
}

/// Number of times the clause terms occur contiguously in `text`.
fn phrase_count(text: &str, terms: &[String]) -> usize {
    let tokens = tokenize(text);
    if terms.is_empty() || tokens.len() < terms.len() {
        return 0;
    }
    tokens
        .windows(terms.len())
        .filter(|w| w.iter().zip(terms).all(|(a, b)| a == b))
        .count()
}

fn boost(field: &str) -> f64 {
    if field == FIELD_NAME {
        NAME_BOOST
    } else {
        1.0
    }
}

/// Weighted occurrence score of one clause against one document.
fn clause_score(doc: &SearchDocument, clause: &QueryClause) -> f64 {
    match clause.field.as_deref() {
        Some(field) if is_keyword_field(field) => match doc.field(field) {
            Some(value) if value.trim().to_lowercase() == clause.raw.to_lowercase() => 1.0,
            _ => 0.0,
        },
        Some(field) => doc
            .field(field)
            .map(|v| phrase_count(v, &clause.terms) as f64 * boost(field))
            .unwrap_or(0.0),
        None => doc
            .fields()
            .into_iter()
            .map(|(field, v)| phrase_count(v, &clause.terms) as f64 * boost(field))
            .sum(),
    }
}

/// Score a document, or `None` when it does not match.
fn score(doc: &SearchDocument, clauses: &[QueryClause]) -> Option<f64> {
    let has_must = clauses.iter().any(|c| c.occur == Occur::Must);
    let mut total = 0.0;
    let mut any_should = false;

    for clause in clauses {
        let s = clause_score(doc, clause);
        match clause.occur {
            Occur::MustNot if s > 0.0 => return None,
            Occur::MustNot => {}
            Occur::Must if s == 0.0 => return None,
            Occur::Must => total += s,
            Occur::Should => {
                if s > 0.0 {
                    any_should = true;
                }
                total += s;
            }
        }
    }

    if !has_must && !any_should {
        return None;
    }
    Some(total)
}

/// Wrap matched words of `value` in `<mark>`, around the first match.
fn fragment(value: &str, terms: &HashSet<&str>) -> Option<String> {
    let words: Vec<&str> = value.split_whitespace().collect();
    let is_match = |w: &str| tokenize(w).iter().any(|t| terms.contains(t.as_str()));
    let first = words.iter().position(|w| is_match(*w))?;

    let start = first.saturating_sub(FRAGMENT_LEAD);
    let end = (start + FRAGMENT_WORDS).min(words.len());
    let mut out: Vec<String> = words[start..end]
        .iter()
        .map(|w| {
            if is_match(*w) {
                format!("<mark>{w}</mark>")
            } else {
                (*w).to_string()
            }
        })
        .collect();
    if start > 0 {
        out.insert(0, "…".to_string());
    }
    if end < words.len() {
        out.push("…".to_string());
    }
    Some(out.join(" "))
}

fn fragments(doc: &SearchDocument, request: &SearchRequest) -> Fragments {
    let mut fragments = Fragments::new();
    for field in &request.highlight_fields {
        let Some(value) = doc.field(field) else {
            continue;
        };
        let terms: HashSet<&str> = request
            .query
            .positive()
            .filter(|c| c.field.as_deref().map_or(true, |f| f == field))
            .flat_map(|c| c.terms.iter().map(String::as_str))
            .collect();
        if let Some(f) = fragment(value, &terms) {
            fragments.insert(field.clone(), vec![f]);
        }
    }
    fragments
}

#[async_trait]
impl TextIndex for MemoryIndex {
    async fn upsert(&self, key: &str, document: &SearchDocument) -> Result<(), CoreError> {
        self.docs
            .write()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), document.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), CoreError> {
        self.docs.write().map_err(|_| poisoned())?.clear();
        Ok(())
    }

    async fn query(&self, request: &SearchRequest) -> Result<SearchResponse, CoreError> {
        let docs = self.docs.read().map_err(|_| poisoned())?;

        let mut matches: Vec<(&String, &SearchDocument, f64)> = docs
            .iter()
            .filter_map(|(key, doc)| score(doc, &request.query.clauses).map(|s| (key, doc, s)))
            .collect();
        matches.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| a.0.cmp(b.0)));

        let mut facets = BTreeMap::new();
        for facet in &request.facets {
            let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
            for (_, doc, _) in &matches {
                if let Some(value) = doc.field(&facet.field).filter(|v| !v.is_empty()) {
                    *counts.entry(value).or_default() += 1;
                }
            }
            let mut counts: Vec<FacetCount> = counts
                .into_iter()
                .map(|(value, count)| FacetCount {
                    value: value.to_string(),
                    count,
                })
                .collect();
            counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
            counts.truncate(facet.size);
            facets.insert(facet.field.clone(), counts);
        }

        let total = matches.len() as i64;
        let hits = matches
            .into_iter()
            .take(request.limit)
            .map(|(key, doc, score)| SearchHit {
                key: key.clone(),
                score,
                fragments: fragments(doc, request),
            })
            .collect();

        Ok(SearchResponse {
            hits,
            total,
            facets,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
