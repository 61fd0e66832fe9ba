//! Rebuilds the search index from the primary store.
//!
//! ```text
//! agora-indexer [--print] [--] [QUERY]...
//! ```
//!
//! `--print` dumps every indexed document as JSON; a trailing QUERY runs a
//! search against the fresh index and prints the results by category.
//! Queries with `-term` exclusions go after `--`.

mod config;

use std::process::ExitCode;
use std::sync::Arc;

use agora_core::content_parser::ParserConfig;
use agora_core::directory::Directory;
use agora_core::page::PageType;
use agora_core::search::SearchResults;
use agora_db::{PgStore, PgTextIndex};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::IndexerConfig;

/// Rebuild the Agora search index.
#[derive(Parser, Debug)]
#[command(name = "agora-indexer", version, about)]
struct Args {
    /// Print every indexed document as JSON.
    #[arg(long)]
    print: bool,

    /// Search the fresh index with this query.
    query: Vec<String>,
}

impl Args {
    fn query(&self) -> Option<String> {
        Some(self.query.join(" ")).filter(|q| !q.trim().is_empty())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agora_indexer=info,agora_core=info,agora_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = IndexerConfig::from_env();
    tracing::info!(index = %config.index_name, "Loaded indexer configuration");

    let parser = match &config.parser_config_path {
        Some(path) => ParserConfig::from_json_file(path).expect("Failed to load parser config"),
        None => ParserConfig::default(),
    };

    // --- Database ---
    let pool = agora_db::create_pool(&config.database_url, config.max_connections)
        .await
        .expect("Failed to connect to database");
    agora_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    agora_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let store = Arc::new(PgStore::new(pool.clone()));
    let index = Arc::new(
        PgTextIndex::open_or_create(pool, &config.index_name)
            .await
            .expect("Failed to open search index"),
    );
    let directory = Directory::new(store.clone(), store, index.clone(), parser);

    // --- Rebuild ---
    let report = match directory.search_sync().rebuild().await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "Reindex failed");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        index = index.name(),
        indexed = report.indexed,
        skipped = report.skipped,
        failed = report.failed,
        "Indexed pages"
    );

    if args.print {
        match index.documents().await {
            Ok(documents) => {
                for (key, document) in documents {
                    let json = serde_json::json!({ "key": key, "document": document });
                    println!("{json:#}");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to read indexed documents");
                return ExitCode::FAILURE;
            }
        }
    }

    if let Some(query) = args.query() {
        match directory.search(&query).await {
            Ok(results) => print_results(&query, &results),
            Err(e) => {
                tracing::error!(error = %e, query = %query, "Search failed");
                return ExitCode::FAILURE;
            }
        }
    }

    if report.failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_results(query: &str, results: &SearchResults) {
    println!("{} results for {query:?}", results.total);
    let grouped = results.by_type();
    for page_type in PageType::ALL {
        let Some(hits) = grouped.get(&page_type) else {
            continue;
        };
        println!("\n{}", page_type.display_name());
        for hit in hits {
            println!("  {} ({}) score={:.3}", hit.page.title, hit.page.url(), hit.score);
            for (field, fragments) in &hit.fragments {
                for fragment in fragments {
                    println!("    {field}: {fragment}");
                }
            }
        }
    }
    for (field, counts) in &results.facets {
        let values: Vec<String> = counts
            .iter()
            .map(|c| format!("{} ({})", c.value, c.count))
            .collect();
        println!("\n{field}: {}", values.join(", "));
    }
}
