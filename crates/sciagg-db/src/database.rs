//! Database connection and table management.
//!
//! The pool holds a single connection, so the dashboard, the CLI and the
//! scheduler never interleave writes. Multi-row writes run in short transactions.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::error::{DbError, Result};
use crate::schema::{self, MIGRATIONS};

/// Main database handle.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    path: String,
}

impl Database {
    /// Open or create the database file at `path` and apply migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let db = Self { pool, path: path.display().to_string() };
        db.initialize().await?;
        info!(path = %db.path, "Database ready");
        Ok(db)
    }

    /// Private in-memory database, used by tests and dry runs.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        // The memory database lives as long as its only connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool, path: ":memory:".to_string() };
        db.initialize().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Apply every migration in order. Safe to call repeatedly.
    pub async fn initialize(&self) -> Result<()> {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&self.pool)
                .await
                .map_err(|source| DbError::Migration { index, source })?;
        }
        debug!(count = MIGRATIONS.len(), "Migrations applied");
        Ok(())
    }

    /// Get table statistics.
    pub async fn stats(&self) -> Result<DatabaseStats> {
        let articles = self.count_rows(schema::TABLE_ARTICLES, None).await?;
        let processed = self
            .count_rows(
                schema::TABLE_ARTICLES,
                Some("summary IS NOT NULL AND post_content IS NOT NULL"),
            )
            .await?;
        let saved = self.count_rows(schema::TABLE_ARTICLES, Some("status = 'saved'")).await?;
        let discarded = self
            .count_rows(schema::TABLE_ARTICLES, Some("status = 'discarded'"))
            .await?;
        let posts = self.count_rows(schema::TABLE_POSTS, None).await?;
        let graph_nodes = self.count_rows(schema::TABLE_GRAPH_NODES, None).await?;
        let graph_edges = self.count_rows(schema::TABLE_GRAPH_EDGES, None).await?;

        Ok(DatabaseStats {
            articles,
            processed,
            saved,
            discarded,
            posts,
            graph_nodes,
            graph_edges,
        })
    }

    async fn count_rows(&self, table: &str, filter: Option<&str>) -> Result<u64> {
        let sql = match filter {
            Some(f) => format!("SELECT COUNT(*) FROM {table} WHERE {f}"),
            None => format!("SELECT COUNT(*) FROM {table}"),
        };
        let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(&self.pool).await?;
        Ok(count as u64)
    }
}

/// Database statistics.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DatabaseStats {
    pub articles: u64,
    pub processed: u64,
    pub saved: u64,
    pub discarded: u64,
    pub posts: u64,
    pub graph_nodes: u64,
    pub graph_edges: u64,
}

// ── Column encoding ──────────────────────────────────────────────────────────
//
// Timestamps are stored as fixed-width RFC 3339 UTC strings so that text
// comparison in SQL matches chronological order.

pub(crate) fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_ts(column: &'static str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DbError::InvalidData { column, value: value.to_string() })
}

pub(crate) fn encode_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn decode_date(column: &'static str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| DbError::InvalidData { column, value: value.to_string() })
}
