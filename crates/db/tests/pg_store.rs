//! Postgres store against a real database.
//!
//! Run with `DATABASE_URL` set and `--ignored`.

use std::sync::Arc;

use agora_core::content_parser::ParserConfig;
use agora_core::error::CoreError;
use agora_core::moderation::{ModerationEngine, SubmitError, SubmitTarget};
use agora_core::page::{NewPage, PageType};
use agora_core::roles::Actor;
use agora_core::store::{PageStore, RevisionStore};
use agora_db::repositories::UserRepo;
use agora_db::PgStore;
use assert_matches::assert_matches;
use sqlx::PgPool;

fn engine(pool: PgPool) -> ModerationEngine {
    let store = Arc::new(PgStore::new(pool));
    ModerationEngine::new(store.clone(), store, Arc::new(ParserConfig::default()))
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn bootstrap_health_check(pool: PgPool) {
    agora_db::health_check(&pool).await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn duplicate_slug_is_conflict(pool: PgPool) {
    let store = PgStore::new(pool);
    store
        .insert_page("Acme", "acme", PageType::Company, None)
        .await
        .unwrap();
    let dup = store
        .insert_page("Acme 2", "acme", PageType::Company, None)
        .await;
    assert_matches!(dup, Err(CoreError::Conflict(_)));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn second_profile_is_conflict(pool: PgPool) {
    let store = PgStore::new(pool);
    store
        .insert_page("Me", "me", PageType::Professional, Some(7))
        .await
        .unwrap();
    let second = store
        .insert_page("Me 2", "me-2", PageType::Professional, Some(7))
        .await;
    assert_matches!(second, Err(CoreError::Conflict(_)));

    // Other page types may share an owner.
    store
        .insert_page("Side", "side", PageType::Company, Some(7))
        .await
        .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn submit_and_approve_round_trip(pool: PgPool) {
    let user = UserRepo::create(&pool, "mario", "user").await.unwrap();
    let admin = UserRepo::create(&pool, "root", "admin").await.unwrap();
    let engine = engine(pool.clone());
    let store = PgStore::new(pool);

    let submitted = engine
        .submit(
            SubmitTarget::New(NewPage {
                title: "Rust Roma".into(),
                slug: None,
                page_type: PageType::Community,
            }),
            "Meetup mensile\n### Dati\n- Città: Roma",
            &Actor::user(user.id),
        )
        .await
        .unwrap();
    assert!(!submitted.approved);
    assert_eq!(submitted.page.slug, "rust-roma");

    let pending = store.list_all_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].author_name.as_deref(), Some("mario"));
    assert_eq!(pending[0].page_title, "Rust Roma");

    let page = engine
        .approve(submitted.page.id, submitted.revision.id, &Actor::admin(admin.id))
        .await
        .unwrap();
    assert_eq!(page.approved_version_id, Some(submitted.revision.id));
    assert_eq!(page.fields.city.as_deref(), Some("Roma"));

    assert!(store.list_all_pending().await.unwrap().is_empty());
    let listed = store
        .list_approved_by_type(PageType::Community)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(store.count_approved_by_type().await.unwrap().communities, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn revision_for_missing_page_is_not_persisted(pool: PgPool) {
    let engine = engine(pool);
    let result = engine
        .submit(SubmitTarget::Existing(12345), "x", &Actor::admin(1))
        .await;
    assert_matches!(
        result,
        Err(SubmitError::Rejected(CoreError::NotFound { entity: "page", .. }))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn history_is_newest_first(pool: PgPool) {
    let store = PgStore::new(pool);
    let page = store
        .insert_page("Go", "go", PageType::Wiki, None)
        .await
        .unwrap();
    let a = store.insert_revision(page.id, 1, "a").await.unwrap();
    let b = store.insert_revision(page.id, 1, "b").await.unwrap();

    let ids: Vec<i64> = store
        .list_for_page(page.id)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![b.id, a.id]);

    let pending = store.list_pending_for_page(page.id, a.id).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].revision.id, b.id);
    assert_eq!(pending[0].author_name, None);
}
