use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use super::CleanupTask;
use crate::db;

pub struct LogCleanup {
    lifetime: Duration,
}

impl LogCleanup {
    pub fn new(lifetime: Duration) -> Self {
        Self { lifetime }
    }
}

#[async_trait]
impl CleanupTask for LogCleanup {
    fn id(&self) -> &str {
        "logs"
    }

    fn describe(&self, deleted: u64) -> String {
        if deleted > 0 {
            format!("{deleted} log records were cleared.")
        } else {
            "No logs needed to be cleared.".to_string()
        }
    }

    async fn run(&self, pool: &PgPool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        db::logs::clear_expired(pool, self.lifetime, now).await
    }
}
