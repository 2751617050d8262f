//! Run log. The scheduler's only cross-run state is the last run timestamp.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::database::{decode_ts, encode_ts, Database};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failed  => "failed",
        }
    }

    fn parse(value: &str) -> Self {
        match value {
            "success" => RunStatus::Success,
            "failed"  => RunStatus::Failed,
            _         => RunStatus::Running,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub id: i64,
    pub kind: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct RunRepository {
    db: Arc<Database>,
}

impl RunRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Record the start of a run and return its id.
    pub async fn start(&self, kind: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO runs (kind, started_at, status) VALUES (?, ?, ?)")
            .bind(kind)
            .bind(encode_ts(&Utc::now()))
            .bind(RunStatus::Running.as_str())
            .execute(self.db.pool())
            .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn finish(&self, id: i64, status: RunStatus, message: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE runs SET finished_at = ?, status = ?, message = ? WHERE id = ?")
            .bind(encode_ts(&Utc::now()))
            .bind(status.as_str())
            .bind(message)
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// Latest run of `kind`, whatever its outcome.
    pub async fn last_run(&self, kind: &str) -> Result<Option<RunRecord>> {
        let row = sqlx::query(
            "SELECT id, kind, started_at, finished_at, status, message FROM runs \
             WHERE kind = ? ORDER BY started_at DESC, id DESC LIMIT 1",
        )
        .bind(kind)
        .fetch_optional(self.db.pool())
        .await?;
        row.as_ref().map(row_to_run).transpose()
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let rows = sqlx::query(
            "SELECT id, kind, started_at, finished_at, status, message FROM runs \
             ORDER BY started_at DESC, id DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(self.db.pool())
        .await?;
        rows.iter().map(row_to_run).collect()
    }
}

fn row_to_run(row: &SqliteRow) -> Result<RunRecord> {
    let started_at: String = row.try_get("started_at")?;
    let finished_at: Option<String> = row.try_get("finished_at")?;
    let status: String = row.try_get("status")?;
    Ok(RunRecord {
        id: row.try_get("id")?,
        kind: row.try_get("kind")?,
        started_at: decode_ts("started_at", &started_at)?,
        finished_at: finished_at.as_deref().map(|f| decode_ts("finished_at", f)).transpose()?,
        status: RunStatus::parse(&status),
        message: row.try_get("message")?,
    })
}
