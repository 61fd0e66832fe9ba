use std::path::PathBuf;

use agora_db::DEFAULT_MAX_CONNECTIONS;

/// Indexer configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub database_url: String,
    /// Name of the full-text index to rebuild (default: `pages`).
    pub index_name: String,
    /// Optional JSON file overriding the built-in parser configuration.
    pub parser_config_path: Option<PathBuf>,
    pub max_connections: u32,
}

impl IndexerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default     |
    /// |----------------------|-------------|
    /// | `DATABASE_URL`       | (required)  |
    /// | `SEARCH_INDEX_NAME`  | `pages`     |
    /// | `PARSER_CONFIG_PATH` | (built-in)  |
    /// | `DB_MAX_CONNECTIONS` | `20`        |
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let index_name = std::env::var("SEARCH_INDEX_NAME")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "pages".into());

        let parser_config_path = std::env::var("PARSER_CONFIG_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let max_connections: u32 = std::env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| DEFAULT_MAX_CONNECTIONS.to_string())
            .parse()
            .expect("DB_MAX_CONNECTIONS must be a valid u32");

        Self {
            database_url,
            index_name,
            parser_config_path,
            max_connections,
        }
    }
}
