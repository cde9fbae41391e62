/*!
common/src/lib.rs

Shared configuration types and DB helper functions for Telepress.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader for a TOML config file, with default/override merging
- A helper to initialize the SQLite seen-store database
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Database configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the sqlite database file (e.g. "data/telepress.db")
    pub path: String,
}

/// News source configuration (the content API queried each run)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// Source identifier as understood by the content API (e.g. "bbc-news")
    pub source: String,
    /// Language of the source articles (e.g. "en")
    pub language: String,
    /// Max number of articles fetched per run
    pub page_size: Option<u32>,
    /// Endpoint override, mainly for tests; defaults to the hosted API
    pub api_url: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// HTTP translation backend config (used if `translator.backend = "http"`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpTranslatorConfig {
    pub api_url: String,
    /// Optional: name of the env var holding the service API key
    pub api_key_env: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Chat-completion translation backend config (used if `translator.backend = "chat"`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTranslatorConfig {
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
    pub timeout_seconds: Option<u64>,
}

/// Translator top-level config grouping backend specifics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    pub backend: Option<String>, // "http", "chat"
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
    pub http: Option<HttpTranslatorConfig>,
    pub chat: Option<ChatTranslatorConfig>,
}

/// Messaging channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Channel identifier, e.g. "@MyNewsChannel" or a numeric chat id
    pub channel: String,
    /// Name of the environment variable holding the bot token
    pub token_env: Option<String>,
    /// Endpoint override, mainly for tests; defaults to the hosted Bot API
    pub api_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Pacing between posts, to respect channel throughput limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    pub delay_seconds: Option<u64>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub news: NewsConfig,
    pub translator: TranslatorConfig,
    pub telegram: TelegramConfig,
    pub pacing: Option<PacingConfig>,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        if let Some(path) = default_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read default config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse default configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        if let Some(path) = override_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read override config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse override configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Initialize an SQLite connection pool.
///
/// This function will create the parent directory if necessary, ensure the DB file exists
/// (attempting to create it if missing), and return a configured `SqlitePool`. An absent
/// storage file is simply an empty store: the first run creates it.
///
/// Example:
///   let pool = init_db_pool("data/telepress.db").await?;
pub async fn init_db_pool(path: &str) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create DB parent directory: {}", parent.display())
            })?;
        }
    }

    // Try to create the DB file if it does not already exist. This gives a clearer error
    // earlier (filesystem permission or path issues) instead of only surfacing it via the
    // SQLite connection attempt.
    tokio::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to create or open DB file: {}", path))?;

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    // A single-run batch job needs very few connections.
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to sqlite database at path: {}", path))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [database]
        path = "data/test.db"

        [news]
        source = "bbc-news"
        language = "en"
        page_size = 15

        [translator]
        backend = "http"
        source_lang = "en"
        target_lang = "fa"

        [translator.http]
        api_url = "http://localhost:5000/translate"

        [telegram]
        channel = "@TestChannel"

        [pacing]
        delay_seconds = 2
    "#;

    #[test]
    fn config_parses_from_toml() {
        let cfg: Config = toml::from_str(SAMPLE).expect("parse config");
        assert_eq!(cfg.news.source, "bbc-news");
        assert_eq!(cfg.news.page_size, Some(15));
        assert_eq!(cfg.translator.backend.as_deref(), Some("http"));
        assert_eq!(cfg.telegram.channel, "@TestChannel");
        assert_eq!(cfg.pacing.and_then(|p| p.delay_seconds), Some(2));
    }

    #[tokio::test]
    async fn override_takes_precedence_over_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default_path = dir.path().join("config.default.toml");
        let override_path = dir.path().join("config.toml");

        tokio::fs::write(&default_path, SAMPLE).await.expect("write default");
        tokio::fs::write(
            &override_path,
            r#"
            [news]
            source = "reuters"

            [translator]
            backend = "chat"
            "#,
        )
        .await
        .expect("write override");

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("load merged config");

        // Overridden values win, untouched values survive the merge.
        assert_eq!(cfg.news.source, "reuters");
        assert_eq!(cfg.news.language, "en");
        assert_eq!(cfg.translator.backend.as_deref(), Some("chat"));
        assert_eq!(cfg.telegram.channel, "@TestChannel");
    }

    #[tokio::test]
    async fn db_pool_creates_missing_file_and_parents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("nested").join("telepress.db");
        let db_path_str = db_path.to_string_lossy().to_string();

        let pool = init_db_pool(&db_path_str).await.expect("init pool");
        assert!(db_path.exists());

        // Simple sanity: acquire a connection
        let conn = pool.acquire().await.expect("acquire conn");
        drop(conn);
    }
}
