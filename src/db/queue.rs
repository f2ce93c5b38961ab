use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use sqlx::{Executor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::cutoff;
use crate::models::{PendingSummary, QueueRecord, QueueStatus, QueueSummary, YearWeek};

/// Default age after which a pending record counts as stale.
pub const DEFAULT_STALE_AFTER_HOURS: i64 = 24;

/// Scope applied to every aggregate in addition to its own predicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueFilter {
    pub store_id: Option<i32>,
    pub status: Option<QueueStatus>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub updated_before: Option<DateTime<Utc>>,
}

impl QueueFilter {
    pub fn store(mut self, store_id: i32) -> Self {
        self.store_id = Some(store_id);
        self
    }

    pub fn status(mut self, status: QueueStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn created_after(mut self, at: DateTime<Utc>) -> Self {
        self.created_after = Some(at);
        self
    }

    pub fn created_before(mut self, at: DateTime<Utc>) -> Self {
        self.created_before = Some(at);
        self
    }

    pub fn updated_before(mut self, at: DateTime<Utc>) -> Self {
        self.updated_before = Some(at);
        self
    }

    fn push_where(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        qb.push(" WHERE TRUE");
        if let Some(store_id) = self.store_id {
            qb.push(" AND store_id = ").push_bind(store_id);
        }
        if let Some(status) = self.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(at) = self.created_after {
            qb.push(" AND created_at >= ").push_bind(at);
        }
        if let Some(at) = self.created_before {
            qb.push(" AND created_at < ").push_bind(at);
        }
        if let Some(at) = self.updated_before {
            qb.push(" AND updated_at < ").push_bind(at);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregate {
    CountByStatus(QueueStatus),
    LastProcessed,
    /// Pending records created, and if touched also updated, before `cutoff`.
    PendingStale { cutoff: DateTime<Utc> },
    FailuresByWeek,
}

/// Build the aggregate query for `filter`. Each call returns a fresh builder.
pub fn summary_query(filter: &QueueFilter, aggregate: Aggregate) -> QueryBuilder<'static, Postgres> {
    let columns = match aggregate {
        Aggregate::CountByStatus(_) => "COUNT(*) AS count",
        Aggregate::LastProcessed => "MAX(updated_at) AS last_processed_at",
        Aggregate::PendingStale { .. } => {
            "COUNT(*) AS count, MIN(created_at) AS oldest_created_at, \
             MAX(updated_at) AS newest_updated_at"
        }
        Aggregate::FailuresByWeek => {
            "EXTRACT(ISOYEAR FROM created_at AT TIME ZONE 'UTC')::int4 AS iso_year, \
             EXTRACT(WEEK FROM created_at AT TIME ZONE 'UTC')::int4 AS iso_week, \
             COUNT(*) AS count"
        }
    };

    let mut qb = QueryBuilder::new("SELECT ");
    qb.push(columns).push(" FROM queue_records");
    filter.push_where(&mut qb);

    match aggregate {
        Aggregate::CountByStatus(status) => {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        Aggregate::LastProcessed => {}
        Aggregate::PendingStale { cutoff } => {
            qb.push(" AND status = ").push_bind(QueueStatus::Pending.as_str());
            qb.push(" AND created_at < ").push_bind(cutoff);
            qb.push(" AND (updated_at IS NULL OR updated_at < ")
                .push_bind(cutoff)
                .push(")");
        }
        Aggregate::FailuresByWeek => {
            qb.push(" AND status = ").push_bind(QueueStatus::Failed.as_str());
            qb.push(" GROUP BY iso_year, iso_week ORDER BY iso_year, iso_week");
        }
    }

    qb
}

/// Read-only aggregates over `queue_records`, narrowed by a [`QueueFilter`].
pub struct QueueSummaryReader<'a> {
    pool: &'a PgPool,
    filter: QueueFilter,
    stale_after: Duration,
}

impl<'a> QueueSummaryReader<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            filter: QueueFilter::default(),
            stale_after: Duration::hours(DEFAULT_STALE_AFTER_HOURS),
        }
    }

    pub fn with_filter(mut self, filter: QueueFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub async fn count_by_status(&self, status: QueueStatus) -> Result<i64, sqlx::Error> {
        self.count_with(self.pool, status).await
    }

    pub async fn last_processed_at(&self) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
        self.last_processed_with(self.pool).await
    }

    pub async fn pending_over_a_day(&self) -> Result<PendingSummary, sqlx::Error> {
        self.pending_over_a_day_at(Utc::now()).await
    }

    pub async fn pending_over_a_day_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<PendingSummary, sqlx::Error> {
        self.pending_with(self.pool, now).await
    }

    pub async fn failure_counts_by_week(&self) -> Result<BTreeMap<YearWeek, i64>, sqlx::Error> {
        self.failures_with(self.pool).await
    }

    pub async fn snapshot(&self) -> Result<QueueSummary, sqlx::Error> {
        self.snapshot_at(Utc::now()).await
    }

    /// All four aggregates in one value, with a count for every status.
    ///
    /// Runs in a single read-only `REPEATABLE READ` transaction so every
    /// figure is taken from the same view of the table.
    pub async fn snapshot_at(&self, now: DateTime<Utc>) -> Result<QueueSummary, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let mut counts = BTreeMap::new();
        for status in QueueStatus::ALL {
            counts.insert(status, self.count_with(&mut *tx, status).await?);
        }

        let summary = QueueSummary {
            counts,
            last_processed_at: self.last_processed_with(&mut *tx).await?,
            pending_over_a_day: self.pending_with(&mut *tx, now).await?,
            failures_by_week: self.failures_with(&mut *tx).await?,
        };

        tx.commit().await?;
        Ok(summary)
    }

    async fn count_with<'e, E>(&self, executor: E, status: QueueStatus) -> Result<i64, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = summary_query(&self.filter, Aggregate::CountByStatus(status));
        let (count,): (i64,) = qb.build_query_as().fetch_one(executor).await?;
        Ok(count)
    }

    async fn last_processed_with<'e, E>(
        &self,
        executor: E,
    ) -> Result<Option<DateTime<Utc>>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = summary_query(&self.filter, Aggregate::LastProcessed);
        let (last,): (Option<DateTime<Utc>>,) = qb.build_query_as().fetch_one(executor).await?;
        Ok(last)
    }

    async fn pending_with<'e, E>(
        &self,
        executor: E,
        now: DateTime<Utc>,
    ) -> Result<PendingSummary, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stale_cutoff = cutoff(now, self.stale_after)?;
        let mut qb = summary_query(
            &self.filter,
            Aggregate::PendingStale {
                cutoff: stale_cutoff,
            },
        );
        qb.build_query_as::<PendingSummary>()
            .fetch_one(executor)
            .await
    }

    async fn failures_with<'e, E>(&self, executor: E) -> Result<BTreeMap<YearWeek, i64>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = summary_query(&self.filter, Aggregate::FailuresByWeek);
        let rows: Vec<(i32, i32, i64)> = qb.build_query_as().fetch_all(executor).await?;

        Ok(rows
            .into_iter()
            .map(|(year, week, count)| (YearWeek::new(year, week as u32), count))
            .collect())
    }
}

pub async fn enqueue(
    pool: &PgPool,
    store_id: i32,
    entity_type: &str,
    entity_id: &str,
) -> Result<QueueRecord, sqlx::Error> {
    sqlx::query_as::<_, QueueRecord>(
        "INSERT INTO queue_records (id, store_id, entity_type, entity_id)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(store_id)
    .bind(entity_type)
    .bind(entity_id)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<QueueRecord>, sqlx::Error> {
    sqlx::query_as::<_, QueueRecord>("SELECT * FROM queue_records WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Record a transmission attempt outcome. Bumps `attempts` and stamps `updated_at`.
pub async fn set_status(
    pool: &PgPool,
    id: Uuid,
    status: QueueStatus,
    message: Option<&str>,
) -> Result<Option<QueueRecord>, sqlx::Error> {
    sqlx::query_as::<_, QueueRecord>(
        "UPDATE queue_records
         SET status = $2, message = $3, attempts = attempts + 1, updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(status.as_str())
    .bind(message)
    .fetch_optional(pool)
    .await
}

/// Retention windows for finished transmissions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueLifetimes {
    pub completed: Duration,
    pub failed: Duration,
}

/// Delete completed and failed records older than their lifetimes in one statement.
pub async fn clear_expired(
    pool: &PgPool,
    lifetimes: &QueueLifetimes,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let completed_cutoff = cutoff(now, lifetimes.completed)?;
    let failed_cutoff = cutoff(now, lifetimes.failed)?;

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "DELETE FROM queue_records
         WHERE (status = $1 AND created_at < $2)
            OR (status = $3 AND created_at < $4)",
    )
    .bind(QueueStatus::Completed.as_str())
    .bind(completed_cutoff)
    .bind(QueueStatus::Failed.as_str())
    .bind(failed_cutoff)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(result.rows_affected())
}
