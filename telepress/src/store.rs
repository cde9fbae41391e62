use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

/// Errors from the seen-item store. Apart from `Duplicate`, any write
/// failure puts the dedup invariant at risk and must abort the run.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a seen record already exists for this url")]
    Duplicate,

    #[error("seen store query failed: {0}")]
    Db(#[from] sqlx::Error),
}

/// Durable set of already-delivered article URLs.
///
/// A row exists iff the article was posted to the channel at least once.
/// The primary key on `url` doubles as a backstop against overlapping runs:
/// a lost exists/record race degrades to a duplicate post, never to a
/// corrupted store.
pub struct SeenStore {
    pool: SqlitePool,
}

impl SeenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the articles table on first run.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        info!("store: ensuring DB schema (CREATE TABLE IF NOT EXISTS ...)");
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                url TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                sent_at TIMESTAMP NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// True iff a seen record for `url` is present.
    pub async fn exists(&self, url: &str) -> Result<bool, StoreError> {
        let hit = sqlx::query_scalar::<_, i64>("SELECT 1 FROM articles WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(hit.is_some())
    }

    /// Inserts a seen record. Callers check `exists` first; the uniqueness
    /// constraint still rejects a second insert for the same url.
    pub async fn record(
        &self,
        url: &str,
        title: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("INSERT INTO articles (url, title, sent_at) VALUES (?, ?, ?)")
            .bind(url)
            .bind(title)
            .bind(sent_at)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => {
                debug!("seen record written for {}", url);
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::Duplicate),
            Err(e) => Err(StoreError::Db(e)),
        }
    }
}

// SQLite primary-key violations: 1555 (primary key) or 2067 (unique index).
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db
            .code()
            .map(|code| code == "1555" || code == "2067")
            .unwrap_or(false),
        _ => false,
    }
}
