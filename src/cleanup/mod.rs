pub mod logs;
pub mod queue;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::config::RetentionConfig;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CleanupOutcome {
    pub deleted: u64,
    pub message: String,
}

/// A retention sweep over one table. Runs as a single bulk statement.
#[async_trait]
pub trait CleanupTask: Send + Sync {
    fn id(&self) -> &str;
    fn describe(&self, deleted: u64) -> String;
    async fn run(&self, pool: &PgPool, now: DateTime<Utc>) -> Result<u64, sqlx::Error>;

    async fn execute(&self, pool: &PgPool, now: DateTime<Utc>) -> Result<CleanupOutcome, sqlx::Error> {
        let deleted = self.run(pool, now).await?;
        Ok(CleanupOutcome {
            deleted,
            message: self.describe(deleted),
        })
    }
}

pub struct CleanupRegistry {
    tasks: BTreeMap<String, Arc<dyn CleanupTask>>,
}

impl CleanupRegistry {
    pub fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
        }
    }

    /// Registry holding the queue and log sweeps for `retention`.
    pub fn from_retention(retention: &RetentionConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(queue::QueueCleanup::new(retention.queue_lifetimes())));
        registry.register(Arc::new(logs::LogCleanup::new(retention.log_lifetime())));
        registry
    }

    pub fn register(&mut self, task: Arc<dyn CleanupTask>) {
        self.tasks.insert(task.id().to_string(), task);
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn CleanupTask>> {
        self.tasks.get(id)
    }

    pub fn list(&self) -> Vec<&Arc<dyn CleanupTask>> {
        self.tasks.values().collect()
    }
}

impl Default for CleanupRegistry {
    fn default() -> Self {
        Self::new()
    }
}
