#![allow(dead_code)]

use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use txqueue::config::{Config, RetentionConfig};
use txqueue::models::QueueStatus;
use txqueue::state::SharedState;

pub const ADMIN_TOKEN: &str = "test-admin-token-long-enough";

/// A fresh, migrated test database. Dropped by [`TestDb::cleanup`].
pub struct TestDb {
    pub pool: PgPool,
    pub db_name: String,
    pub url: String,
}

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub db: TestDb,
    pub state: SharedState,
    pub client: Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn pool(&self) -> &PgPool {
        &self.db.pool
    }

    /// Make an authenticated GET request.
    pub async fn get_auth(&self, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(ADMIN_TOKEN)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make an authenticated POST request without a body.
    pub async fn post_auth(&self, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(ADMIN_TOKEN)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

fn base_url() -> String {
    let _ = dotenvy::dotenv();
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests")
}

fn admin_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string())
}

/// Create a uniquely named database and run migrations on it.
pub async fn spawn_db() -> TestDb {
    let base_url = base_url();
    let db_name = format!("txqueue_test_{}", Uuid::now_v7().to_string().replace('-', ""));

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    TestDb { pool, db_name, url }
}

/// Spawn a test app with a fresh temporary database.
pub async fn spawn_app() -> TestApp {
    let db = spawn_db().await;

    let config = Config {
        database_url: db.url.clone(),
        admin_token: ADMIN_TOKEN.to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        log_level: "warn".to_string(),
        stale_after_hours: 24,
        retention: RetentionConfig::default(),
        cleanup_interval_secs: 0,
    };

    let (app, state) = txqueue::build_app(db.pool.clone(), config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        db,
        state,
        client: Client::new(),
    }
}

/// Insert a queue record with explicit timestamps.
pub async fn insert_record(
    pool: &PgPool,
    store_id: i32,
    status: QueueStatus,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO queue_records (id, store_id, entity_type, entity_id, status, created_at, updated_at)
         VALUES ($1, $2, 'invoice', $3, $4, $5, $6)",
    )
    .bind(id)
    .bind(store_id)
    .bind(id.to_string())
    .bind(status.as_str())
    .bind(created_at)
    .bind(updated_at)
    .execute(pool)
    .await
    .expect("Failed to insert queue record");
    id
}

/// Insert a log entry with an explicit timestamp.
pub async fn insert_log(pool: &PgPool, level: &str, created_at: DateTime<Utc>) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO log_entries (id, level, message, created_at) VALUES ($1, $2, 'test', $3)",
    )
    .bind(id)
    .bind(level)
    .bind(created_at)
    .execute(pool)
    .await
    .expect("Failed to insert log entry");
    id
}

pub async fn queue_len(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM queue_records")
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Drop the test database after tests complete.
pub async fn cleanup(db: TestDb) {
    let db_name = db.db_name.clone();
    db.pool.close().await;

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url()))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
