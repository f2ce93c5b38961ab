pub mod logs;
pub mod queue;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Queue
        .route("/api/v1/queue/summary", get(queue::summary))
        .route("/api/v1/queue/count", get(queue::count))
        .route("/api/v1/queue/clear", post(queue::clear))
        .route("/api/v1/queue/{id}", get(queue::get))
        // Logs
        .route("/api/v1/logs", get(logs::list))
        .route("/api/v1/logs/summary", get(logs::summary))
        .route("/api/v1/logs/clear", post(logs::clear))
}
