use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{LogEntry, LogLevel};

pub struct NewLogEntry<'a> {
    pub store_id: Option<i32>,
    pub level: LogLevel,
    pub message: &'a str,
    pub source: Option<&'a str>,
    pub request: Option<&'a str>,
    pub result: Option<&'a str>,
    pub context: Option<&'a serde_json::Value>,
}

pub async fn create(pool: &PgPool, entry: &NewLogEntry<'_>) -> Result<LogEntry, sqlx::Error> {
    sqlx::query_as::<_, LogEntry>(
        "INSERT INTO log_entries (id, store_id, level, message, source, request, result, context)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(entry.store_id)
    .bind(entry.level.as_str())
    .bind(entry.message)
    .bind(entry.source)
    .bind(entry.request)
    .bind(entry.result)
    .bind(entry.context)
    .fetch_one(pool)
    .await
}

/// Entry count per level. Every level is present, unseen ones with zero.
pub async fn level_summary(
    pool: &PgPool,
    store_id: Option<i32>,
) -> Result<BTreeMap<LogLevel, i64>, sqlx::Error> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT level, COUNT(*) FROM log_entries
         WHERE ($1::int4 IS NULL OR store_id = $1)
         GROUP BY level",
    )
    .bind(store_id)
    .fetch_all(pool)
    .await?;

    let mut summary: BTreeMap<LogLevel, i64> =
        LogLevel::ALL.into_iter().map(|level| (level, 0)).collect();

    for (level, count) in rows {
        match level.parse::<LogLevel>() {
            Ok(level) => *summary.entry(level).or_default() += count,
            Err(e) => tracing::warn!("Skipping log rows with unrecognised level: {e}"),
        }
    }

    Ok(summary)
}

pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<LogEntry>, sqlx::Error> {
    sqlx::query_as::<_, LogEntry>(
        "SELECT * FROM log_entries ORDER BY created_at DESC LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Delete entries older than `lifetime` in a single statement.
pub async fn clear_expired(
    pool: &PgPool,
    lifetime: Duration,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let cutoff = super::cutoff(now, lifetime)?;
    let mut tx = pool.begin().await?;

    let result = sqlx::query("DELETE FROM log_entries WHERE created_at < $1")
        .bind(cutoff)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.rows_affected())
}
