//! Persistent username→cookie access history.
//!
//! A single local SQLite file records every Douyin user the service has
//! fetched with a session cookie, so the background refresher can keep
//! those feeds warm across restarts. Writes are serialized by a
//! process-wide mutex; a `put` that returned is visible to any later
//! `list` snapshot.

use crate::error::Result;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub username: String,
    pub cookie: String,
}

pub struct AccessHistory {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl AccessHistory {
    /// Open (or create) the store at `path`. The file and its parent
    /// directory are created on first use.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS access_history (
                username TEXT PRIMARY KEY,
                cookie   TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self {
            pool,
            write_lock: Mutex::new(()),
        })
    }

    /// Idempotent upsert: a second `put` for the same username replaces
    /// the cookie rather than duplicating the entry. I/O errors surface
    /// to the caller.
    pub async fn put(&self, username: &str, cookie: &str) -> Result<()> {
        let _serialized = self.write_lock.lock().await;
        sqlx::query(
            r#"
            INSERT INTO access_history (username, cookie)
            VALUES (?, ?)
            ON CONFLICT(username) DO UPDATE SET cookie = excluded.cookie
            "#,
        )
        .bind(username)
        .bind(cookie)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Snapshot of the current entries, order unspecified. Unreadable
    /// storage degrades to an empty snapshot with a warning so list-only
    /// callers (the refresher) keep running.
    pub async fn list(&self) -> Vec<HistoryEntry> {
        let rows = sqlx::query("SELECT username, cookie FROM access_history")
            .fetch_all(&self.pool)
            .await;

        match rows {
            Ok(rows) => rows
                .into_iter()
                .map(|row| HistoryEntry {
                    username: row.get(0),
                    cookie: row.get(1),
                })
                .collect(),
            Err(e) => {
                warn!(error = %e, "access history unreadable, returning empty snapshot");
                Vec::new()
            }
        }
    }
}
