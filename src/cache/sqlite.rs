//! Shared persistent cache backend on SQLite.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use tokio::time::Duration;
use tracing::{info, warn};

use super::CacheEntry;
use crate::article::Article;
use crate::TARGET_CACHE;

pub struct SqliteCache {
    pool: Pool<Sqlite>,
}

impl SqliteCache {
    pub async fn new(path: &str) -> Result<Self, sqlx::Error> {
        let connect_options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;

        let cache = SqliteCache { pool };
        cache.initialize_schema().await?;
        info!(target: TARGET_CACHE, "SQLite cache pool created for {}", path);
        Ok(cache)
    }

    async fn initialize_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                written_at TEXT NOT NULL,
                partial INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>, sqlx::Error> {
        let row: Option<(String, String, i64, i64)> = sqlx::query_as(
            "SELECT payload, written_at, partial, expires_at FROM cache_entries WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        let Some((payload, written_at, partial, expires_at)) = row else {
            return Ok(None);
        };

        if expires_at <= Utc::now().timestamp() {
            // Lazy expiry: remove the stale row and report a miss.
            sqlx::query("DELETE FROM cache_entries WHERE key = ?")
                .bind(key)
                .execute(&self.pool)
                .await?;
            return Ok(None);
        }

        let payload: Vec<Article> = match serde_json::from_str(&payload) {
            Ok(articles) => articles,
            Err(err) => {
                warn!(target: TARGET_CACHE, "Discarding undecodable cache entry {}: {}", key, err);
                return Ok(None);
            }
        };
        let written_at = DateTime::parse_from_rfc3339(&written_at)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Some(CacheEntry {
            payload,
            written_at,
            partial: partial != 0,
        }))
    }

    pub async fn set(
        &self,
        key: &str,
        entry: &CacheEntry,
        ttl_seconds: u64,
    ) -> Result<(), sqlx::Error> {
        let payload = match serde_json::to_string(&entry.payload) {
            Ok(json) => json,
            Err(err) => {
                warn!(target: TARGET_CACHE, "Failed to serialize cache entry {}: {}", key, err);
                return Ok(());
            }
        };
        let expires_at = Utc::now().timestamp() + ttl_seconds as i64;

        sqlx::query(
            "INSERT OR REPLACE INTO cache_entries (key, payload, written_at, partial, expires_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(key)
        .bind(payload)
        .bind(entry.written_at.to_rfc3339())
        .bind(entry.partial as i64)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM cache_entries")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Tear down the pool so every later operation fails, simulating a store
    /// that dies mid-session.
    #[cfg(test)]
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn len(&self) -> Result<usize, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM cache_entries WHERE expires_at > ?",
        )
        .bind(Utc::now().timestamp())
        .fetch_one(&self.pool)
        .await?;
        Ok(count as usize)
    }
}
