//! Repository for named full-text indexes (`search_indexes`,
//! `search_documents`).
//!
//! Text clauses run against Postgres `tsvector`s with the `italian`
//! configuration; keyword fields (`category`, `city`, `sector`) compare whole
//! values case-insensitively. Highlights come from `ts_headline`.

use agora_core::search::query::phrase_tsquery;
use agora_core::search::{
    is_keyword_field, Occur, ParsedQuery, QueryClause, SearchDocument, SearchRequest,
    FIELD_CATEGORY, FIELD_CITY, FIELD_CONTENT, FIELD_NAME, FIELD_SECTOR,
};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::models::search::{FacetRow, SearchDocumentRow, SearchHitRow};

/// Column list for search_documents queries.
const COLUMNS: &str = "doc_key, name, category, city, sector, content, sections, updated_at";

/// `ts_headline` options: `<mark>` delimiters, short fragments.
const HEADLINE_OPTIONS: &str = "StartSel=<mark>, StopSel=</mark>, MaxWords=35, MinWords=15";

/// Fields stored as their own columns. Anything else lives in `sections`.
const COLUMN_FIELDS: &[&str] = &[
    FIELD_NAME,
    FIELD_CATEGORY,
    FIELD_CITY,
    FIELD_SECTOR,
    FIELD_CONTENT,
];

/// Provides storage and querying for search documents.
pub struct SearchRepo;

impl SearchRepo {
    // -----------------------------------------------------------------------
    // Index lifecycle
    // -----------------------------------------------------------------------

    /// Register an index name. Existing indexes are left untouched.
    pub async fn register_index(pool: &PgPool, name: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO search_indexes (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Delete every document of an index. Returns the number removed.
    pub async fn clear(pool: &PgPool, index_name: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM search_documents WHERE index_name = $1")
            .bind(index_name)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    pub async fn upsert(
        pool: &PgPool,
        index_name: &str,
        key: &str,
        doc: &SearchDocument,
    ) -> Result<(), sqlx::Error> {
        let sections_text = doc
            .sections
            .values()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        sqlx::query(
            "INSERT INTO search_documents
                (index_name, doc_key, name, category, city, sector, content, sections, sections_text)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (index_name, doc_key) DO UPDATE SET
                name = EXCLUDED.name,
                category = EXCLUDED.category,
                city = EXCLUDED.city,
                sector = EXCLUDED.sector,
                content = EXCLUDED.content,
                sections = EXCLUDED.sections,
                sections_text = EXCLUDED.sections_text,
                updated_at = now()",
        )
        .bind(index_name)
        .bind(key)
        .bind(&doc.name)
        .bind(&doc.category)
        .bind(&doc.city)
        .bind(&doc.sector)
        .bind(&doc.content)
        .bind(Json(&doc.sections))
        .bind(sections_text)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Every document of an index, ordered by key.
    pub async fn list(
        pool: &PgPool,
        index_name: &str,
    ) -> Result<Vec<SearchDocumentRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM search_documents WHERE index_name = $1 ORDER BY doc_key"
        );
        sqlx::query_as::<_, SearchDocumentRow>(&query)
            .bind(index_name)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Querying
    // -----------------------------------------------------------------------

    /// Ranked hits with highlights, best first, at most `request.limit`.
    pub async fn search_hits(
        pool: &PgPool,
        index_name: &str,
        request: &SearchRequest,
    ) -> Result<Vec<SearchHitRow>, sqlx::Error> {
        let positive = positive_tsquery(&request.query);

        let mut qb = QueryBuilder::<Postgres>::new("SELECT doc_key, (");
        push_rank(&mut qb, &request.query, positive.as_deref());
        qb.push(")::FLOAT8 AS score");
        for (i, field) in request.highlight_fields.iter().enumerate() {
            qb.push(", ");
            match positive.as_deref() {
                Some(tsquery) => push_headline(&mut qb, field, tsquery),
                None => {
                    qb.push("NULL::TEXT");
                }
            }
            qb.push(format!(" AS hl_{i}"));
        }
        qb.push(" FROM search_documents");
        push_filter(&mut qb, index_name, &request.query);
        qb.push(" ORDER BY score DESC, doc_key ASC LIMIT ");
        qb.push_bind(request.limit as i64);

        let rows = qb.build().fetch_all(pool).await?;
        rows.iter()
            .map(|row| hit_from_row(row, request.highlight_fields.len()))
            .collect()
    }

    /// Number of documents matching the query, ignoring the limit.
    pub async fn count(
        pool: &PgPool,
        index_name: &str,
        query: &ParsedQuery,
    ) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM search_documents");
        push_filter(&mut qb, index_name, query);
        qb.build_query_scalar::<i64>().fetch_one(pool).await
    }

    /// Top `size` values of `field` among matching documents.
    pub async fn facet(
        pool: &PgPool,
        index_name: &str,
        query: &ParsedQuery,
        field: &str,
        size: usize,
    ) -> Result<Vec<FacetRow>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        push_field(&mut qb, field);
        qb.push(" AS value, COUNT(*) AS count FROM search_documents");
        push_filter(&mut qb, index_name, query);
        qb.push(" AND COALESCE(");
        push_field(&mut qb, field);
        qb.push(", '') <> '' GROUP BY value ORDER BY count DESC, value ASC LIMIT ");
        qb.push_bind(size as i64);

        qb.build_query_as::<FacetRow>().fetch_all(pool).await
    }
}

// ---------------------------------------------------------------------------
// SQL builders
// ---------------------------------------------------------------------------

/// Push the SQL expression holding `field`'s value.
fn push_field(qb: &mut QueryBuilder<'_, Postgres>, field: &str) {
    if let Some(column) = COLUMN_FIELDS.iter().find(|c| **c == field) {
        qb.push(*column);
    } else {
        qb.push("(sections ->> ");
        qb.push_bind(field.to_string());
        qb.push(")");
    }
}

/// Push a boolean expression true when the document matches `clause`.
fn push_clause(qb: &mut QueryBuilder<'_, Postgres>, clause: &QueryClause) {
    let tsquery = phrase_tsquery(&clause.terms);
    qb.push("(");
    match clause.field.as_deref() {
        Some(field) if is_keyword_field(field) => {
            qb.push("lower(COALESCE(");
            push_field(qb, field);
            qb.push(", '')) = lower(");
            qb.push_bind(clause.raw.trim().to_string());
            qb.push(")");
        }
        Some(field) => {
            qb.push("to_tsvector('italian', COALESCE(");
            push_field(qb, field);
            qb.push(", '')) @@ to_tsquery('italian', ");
            qb.push_bind(tsquery);
            qb.push(")");
        }
        None => {
            qb.push("search_vector @@ to_tsquery('italian', ");
            qb.push_bind(tsquery);
            qb.push(")");
        }
    }
    qb.push(")");
}

/// Push the `WHERE` clause: every must, no must-not, and at least one
/// should when there are no musts.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, index_name: &str, query: &ParsedQuery) {
    qb.push(" WHERE index_name = ");
    qb.push_bind(index_name.to_string());

    for clause in &query.clauses {
        match clause.occur {
            Occur::Must => {
                qb.push(" AND ");
                push_clause(qb, clause);
            }
            Occur::MustNot => {
                qb.push(" AND NOT ");
                push_clause(qb, clause);
            }
            Occur::Should => {}
        }
    }

    if query.has_must() {
        return;
    }
    let shoulds: Vec<&QueryClause> = query
        .clauses
        .iter()
        .filter(|c| c.occur == Occur::Should)
        .collect();
    if shoulds.is_empty() {
        qb.push(" AND FALSE");
        return;
    }
    qb.push(" AND (");
    for (i, clause) in shoulds.into_iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        push_clause(qb, clause);
    }
    qb.push(")");
}

/// OR of every positive clause's phrase, for ranking and highlighting.
fn positive_tsquery(query: &ParsedQuery) -> Option<String> {
    let phrases: Vec<String> = query
        .positive()
        .map(|c| format!("({})", phrase_tsquery(&c.terms)))
        .collect();
    if phrases.is_empty() {
        None
    } else {
        Some(phrases.join(" | "))
    }
}

/// `ts_rank` over the weighted vector, plus one per satisfied keyword clause.
fn push_rank(qb: &mut QueryBuilder<'_, Postgres>, query: &ParsedQuery, positive: Option<&str>) {
    match positive {
        Some(tsquery) => {
            qb.push("ts_rank(search_vector, to_tsquery('italian', ");
            qb.push_bind(tsquery.to_string());
            qb.push("))");
        }
        None => {
            qb.push("0");
        }
    }
    for clause in query.positive() {
        if clause.field.as_deref().is_some_and(is_keyword_field) {
            qb.push(" + CASE WHEN ");
            push_clause(qb, clause);
            qb.push(" THEN 1 ELSE 0 END");
        }
    }
}

/// A `ts_headline` of `field`, or NULL when the field has no match.
fn push_headline(qb: &mut QueryBuilder<'_, Postgres>, field: &str, tsquery: &str) {
    qb.push("CASE WHEN to_tsvector('italian', COALESCE(");
    push_field(qb, field);
    qb.push(", '')) @@ to_tsquery('italian', ");
    qb.push_bind(tsquery.to_string());
    qb.push(") THEN ts_headline('italian', ");
    push_field(qb, field);
    qb.push(", to_tsquery('italian', ");
    qb.push_bind(tsquery.to_string());
    qb.push("), ");
    qb.push_bind(HEADLINE_OPTIONS);
    qb.push(") END");
}

fn hit_from_row(row: &PgRow, highlight_count: usize) -> Result<SearchHitRow, sqlx::Error> {
    let highlights = (0..highlight_count)
        .map(|i| row.try_get::<Option<String>, _>(format!("hl_{i}").as_str()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SearchHitRow {
        doc_key: row.try_get("doc_key")?,
        score: row.try_get("score")?,
        highlights,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
