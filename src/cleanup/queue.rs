use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::CleanupTask;
use crate::db;
use crate::db::queue::QueueLifetimes;

pub struct QueueCleanup {
    lifetimes: QueueLifetimes,
}

impl QueueCleanup {
    pub fn new(lifetimes: QueueLifetimes) -> Self {
        Self { lifetimes }
    }
}

#[async_trait]
impl CleanupTask for QueueCleanup {
    fn id(&self) -> &str {
        "queue"
    }

    fn describe(&self, deleted: u64) -> String {
        if deleted > 0 {
            format!("{deleted} queued transmissions were cleared.")
        } else {
            "No queued transmissions needed to be cleared.".to_string()
        }
    }

    async fn run(&self, pool: &PgPool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        db::queue::clear_expired(pool, &self.lifetimes, now).await
    }
}
