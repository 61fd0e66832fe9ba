//! Postgres full-text index against a real database.
//!
//! Run with `DATABASE_URL` set and `--ignored`.

use std::collections::BTreeMap;

use agora_core::search::{ParsedQuery, SearchDocument, SearchRequest, TextIndex};
use agora_db::PgTextIndex;
use sqlx::PgPool;

fn doc(name: &str, category: &str, city: &str, content: &str) -> SearchDocument {
    SearchDocument {
        name: name.into(),
        category: category.into(),
        city: Some(city.into()),
        sector: None,
        content: content.into(),
        sections: BTreeMap::from([("skills".to_string(), content.to_string())]),
    }
}

async fn seeded(pool: PgPool) -> PgTextIndex {
    let index = PgTextIndex::open_or_create(pool, "pages").await.unwrap();
    index
        .upsert("1", &doc("Rust Roma", "communities", "Roma", "incontri rust"))
        .await
        .unwrap();
    index
        .upsert("2", &doc("Acme", "companies", "Milano", "sviluppo rust e go"))
        .await
        .unwrap();
    index
        .upsert("3", &doc("Anna", "professionals", "Roma", "consulenza java"))
        .await
        .unwrap();
    index
}

async fn keys(index: &PgTextIndex, q: &str) -> Vec<String> {
    let request = SearchRequest::for_pages(ParsedQuery::parse(q), 20);
    let mut keys: Vec<String> = index
        .query(&request)
        .await
        .unwrap()
        .hits
        .into_iter()
        .map(|h| h.key)
        .collect();
    keys.sort();
    keys
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn text_and_keyword_clauses(pool: PgPool) {
    let index = seeded(pool).await;
    assert_eq!(keys(&index, "rust").await, vec!["1", "2"]);
    assert_eq!(keys(&index, "+rust -go").await, vec!["1"]);
    assert_eq!(keys(&index, "city:roma").await, vec!["1", "3"]);
    assert!(keys(&index, "-rust").await.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn facets_highlights_and_total(pool: PgPool) {
    let index = seeded(pool).await;
    let request = SearchRequest::for_pages(ParsedQuery::parse("rust java"), 1);
    let response = index.query(&request).await.unwrap();

    assert_eq!(response.total, 3);
    assert_eq!(response.hits.len(), 1);
    let cities = &response.facets["city"];
    assert_eq!(cities[0].value, "Roma");
    assert_eq!(cities[0].count, 2);

    let skills = &response.hits[0].fragments["skills"];
    assert!(skills[0].contains("<mark>"));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires a PostgreSQL DATABASE_URL"]
async fn upsert_replaces_and_clear_empties(pool: PgPool) {
    let index = seeded(pool).await;
    index
        .upsert("1", &doc("Rust Roma", "communities", "Roma", "uncinetto"))
        .await
        .unwrap();
    assert_eq!(index.documents().await.unwrap().len(), 3);
    assert_eq!(keys(&index, "incontri").await, Vec::<String>::new());

    index.clear().await.unwrap();
    assert!(index.documents().await.unwrap().is_empty());
}
