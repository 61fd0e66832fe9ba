//! Search synchronization over the in-memory store and index.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use agora_core::content_parser::ParserConfig;
use agora_core::directory::Directory;
use agora_core::error::CoreError;
use agora_core::memory::{MemoryIndex, MemoryStore};
use agora_core::moderation::SubmitTarget;
use agora_core::page::{NewPage, Page, PageType};
use agora_core::roles::Actor;
use agora_core::search::{
    ReindexReport, SearchDocument, SearchRequest, SearchResponse, TextIndex,
};
use agora_core::store::{PageStore, RevisionStore};
use assert_matches::assert_matches;
use async_trait::async_trait;

struct Fixture {
    dir: Directory,
    store: Arc<MemoryStore>,
    index: Arc<MemoryIndex>,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let index = Arc::new(MemoryIndex::new());
    let dir = Directory::new(
        store.clone(),
        store.clone(),
        index.clone(),
        ParserConfig::default(),
    );
    Fixture { dir, store, index }
}

async fn publish(dir: &Directory, title: &str, page_type: PageType, content: &str) -> Page {
    let target = SubmitTarget::New(NewPage {
        title: title.to_string(),
        slug: None,
        page_type,
    });
    dir.submit(target, content, &Actor::admin(1))
        .await
        .unwrap()
        .submitted
        .page
}

#[tokio::test]
async fn approved_page_is_searchable() {
    let fx = fixture();
    let page = publish(
        &fx.dir,
        "Acme",
        PageType::Company,
        "Software house\n### Competenze\nRust, Postgres\n### Dati\n- Città: Torino",
    )
    .await;

    let results = fx.dir.search("postgres").await.unwrap();
    assert_eq!(results.results.len(), 1);
    assert_eq!(results.results[0].page.id, page.id);
    assert_eq!(
        results.results[0].fragments["skills"],
        vec!["Rust, <mark>Postgres</mark>".to_string()]
    );

    let docs = fx.index.documents().unwrap();
    let doc = &docs[&page.id.to_string()];
    assert_eq!(doc.category, "companies");
    assert_eq!(doc.city.as_deref(), Some("Torino"));
    assert!(!doc.sections.contains_key("city"));
    assert!(!doc.content.contains('#'));
}

#[tokio::test]
async fn pending_revision_is_not_indexed() {
    let fx = fixture();
    let page = publish(&fx.dir, "Go Wiki", PageType::Wiki, "goroutines").await;
    fx.dir
        .submit(SubmitTarget::Existing(page.id), "channels", &Actor::user(2))
        .await
        .unwrap();

    assert!(fx.dir.search("channels").await.unwrap().results.is_empty());
    assert_eq!(fx.dir.search("goroutines").await.unwrap().results.len(), 1);
}

#[tokio::test]
async fn stale_index_entry_resolves_to_live_page() {
    let fx = fixture();
    let page = publish(&fx.dir, "Go Wiki", PageType::Wiki, "goroutines").await;

    // A stale document still matches, but the result carries live content.
    let stale = SearchDocument {
        name: "Old Name".into(),
        category: "wiki".into(),
        city: None,
        sector: None,
        content: "legacy".into(),
        sections: BTreeMap::new(),
    };
    fx.index.upsert(&page.id.to_string(), &stale).await.unwrap();

    let results = fx.dir.search("legacy").await.unwrap();
    assert_eq!(results.results.len(), 1);
    assert_eq!(results.results[0].page.title, "Go Wiki");
    assert_eq!(results.results[0].page.approved_content, "goroutines");
}

#[tokio::test]
async fn hits_for_missing_or_unapproved_pages_are_dropped() {
    let fx = fixture();
    let doc = |content: &str| SearchDocument {
        name: "Ghost".into(),
        category: "wiki".into(),
        city: None,
        sector: None,
        content: content.into(),
        sections: BTreeMap::new(),
    };
    fx.index.upsert("404", &doc("phantom")).await.unwrap();
    fx.index.upsert("not-an-id", &doc("phantom")).await.unwrap();

    let hidden = fx
        .dir
        .submit(
            SubmitTarget::New(NewPage {
                title: "Hidden".into(),
                slug: None,
                page_type: PageType::Community,
            }),
            "phantom",
            &Actor::user(2),
        )
        .await
        .unwrap()
        .submitted
        .page;
    fx.index
        .upsert(&hidden.id.to_string(), &doc("phantom"))
        .await
        .unwrap();

    let results = fx.dir.search("phantom").await.unwrap();
    assert!(results.results.is_empty());
    assert_eq!(results.total, 0);
}

#[tokio::test]
async fn empty_query_returns_nothing() {
    let fx = fixture();
    publish(&fx.dir, "Go Wiki", PageType::Wiki, "goroutines").await;
    let results = fx.dir.search("   ").await.unwrap();
    assert!(results.results.is_empty());
    assert_eq!(results.total, 0);
}

#[tokio::test]
async fn facets_and_grouping() {
    let fx = fixture();
    publish(&fx.dir, "Anna", PageType::Professional, "rust\n### Dati\n- Città: Roma").await;
    publish(&fx.dir, "Rustaceans", PageType::Community, "rust\n### Dati\n- Città: Roma").await;
    publish(&fx.dir, "Ferro", PageType::Company, "rust\n### Dati\n- Città: Bari").await;

    let results = fx.dir.search("rust").await.unwrap();
    assert_eq!(results.total, 3);

    let cities = &results.facets["city"];
    assert_eq!(cities[0].value, "Roma");
    assert_eq!(cities[0].count, 2);

    let grouped = results.by_type();
    assert_eq!(grouped.len(), 3);
    assert_eq!(grouped[&PageType::Company][0].page.title, "Ferro");

    let roma = fx.dir.search("+rust city:roma").await.unwrap();
    assert_eq!(roma.results.len(), 3);
    let only_roma = fx.dir.search("+city:roma").await.unwrap();
    assert_eq!(only_roma.results.len(), 2);
}

#[tokio::test]
async fn rebuild_reports_and_restores() {
    let fx = fixture();
    publish(&fx.dir, "Go Wiki", PageType::Wiki, "goroutines").await;
    publish(&fx.dir, "Acme", PageType::Company, "widgets").await;
    let pending = fx
        .dir
        .submit(
            SubmitTarget::New(NewPage {
                title: "Pending".into(),
                slug: None,
                page_type: PageType::Community,
            }),
            "later",
            &Actor::user(2),
        )
        .await
        .unwrap()
        .submitted;
    assert_eq!(
        fx.store.list_for_page(pending.page.id).await.unwrap().len(),
        1
    );

    fx.index.clear().await.unwrap();
    assert!(fx.dir.search("widgets").await.unwrap().results.is_empty());

    let report = fx.dir.search_sync().rebuild().await.unwrap();
    assert_eq!(
        report,
        ReindexReport {
            indexed: 2,
            skipped: 1,
            failed: 0
        }
    );
    assert_eq!(fx.index.documents().unwrap().len(), 2);
    assert_eq!(fx.dir.search("widgets").await.unwrap().results.len(), 1);
}

// ---------------------------------------------------------------------------
// Index write failures
// ---------------------------------------------------------------------------

/// Index whose upserts fail for the keys in `failing`, or for every key when
/// `failing` holds `"*"`.
struct FailingIndex {
    inner: MemoryIndex,
    failing: Mutex<BTreeSet<String>>,
}

impl FailingIndex {
    fn new() -> Self {
        Self {
            inner: MemoryIndex::new(),
            failing: Mutex::new(BTreeSet::new()),
        }
    }

    fn fail(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }
}

#[async_trait]
impl TextIndex for FailingIndex {
    async fn upsert(&self, key: &str, document: &SearchDocument) -> Result<(), CoreError> {
        let failing = self.failing.lock().unwrap().clone();
        if failing.contains("*") || failing.contains(key) {
            return Err(CoreError::Storage("index unavailable".into()));
        }
        self.inner.upsert(key, document).await
    }

    async fn clear(&self) -> Result<(), CoreError> {
        self.inner.clear().await
    }

    async fn query(&self, request: &SearchRequest) -> Result<SearchResponse, CoreError> {
        self.inner.query(request).await
    }
}

fn failing_fixture() -> (Directory, Arc<MemoryStore>, Arc<FailingIndex>) {
    let store = Arc::new(MemoryStore::new());
    let index = Arc::new(FailingIndex::new());
    let dir = Directory::new(
        store.clone(),
        store.clone(),
        index.clone(),
        ParserConfig::default(),
    );
    (dir, store, index)
}

#[tokio::test]
async fn index_failure_is_reported_but_approval_stands() {
    let (dir, store, index) = failing_fixture();
    index.fail("*");

    let published = dir
        .submit(
            SubmitTarget::New(NewPage {
                title: "Go Wiki".into(),
                slug: None,
                page_type: PageType::Wiki,
            }),
            "goroutines",
            &Actor::admin(1),
        )
        .await
        .unwrap();
    assert!(published.submitted.approved);
    assert_matches!(published.index_error, Some(CoreError::Storage(_)));

    let page = store
        .find_page(published.submitted.page.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(page.approved_content, "goroutines");
    assert_eq!(page.approved_version_id, Some(published.submitted.revision.id));
    assert!(dir.search("goroutines").await.unwrap().results.is_empty());

    index.heal();
    let report = dir.search_sync().rebuild().await.unwrap();
    assert_eq!(report.indexed, 1);
    assert_eq!(dir.search("goroutines").await.unwrap().results.len(), 1);
}

#[tokio::test]
async fn rebuild_counts_failures_and_continues() {
    let (dir, _store, index) = failing_fixture();
    let go = publish(&dir, "Go Wiki", PageType::Wiki, "goroutines").await;
    publish(&dir, "Acme", PageType::Company, "widgets").await;
    publish(&dir, "Rustaceans", PageType::Community, "meetup").await;

    index.fail(&go.id.to_string());
    let report = dir.search_sync().rebuild().await.unwrap();
    assert_eq!(
        report,
        ReindexReport {
            indexed: 2,
            skipped: 0,
            failed: 1
        }
    );
    assert!(dir.search("goroutines").await.unwrap().results.is_empty());
    assert_eq!(dir.search("widgets").await.unwrap().results.len(), 1);
    assert_eq!(dir.search("meetup").await.unwrap().results.len(), 1);
}
