use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::Json;
use axum_extra::extract::WithRejection;
use chrono::Utc;
use serde::Deserialize;

use crate::auth::extractor::AdminAuth;
use crate::cleanup::CleanupOutcome;
use crate::db;
use crate::error::AppError;
use crate::models::{LogEntry, LogLevel};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct SummaryParams {
    pub store_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

pub async fn list(
    _auth: AdminAuth,
    State(state): State<SharedState>,
    WithRejection(Query(params), _): WithRejection<Query<ListParams>, AppError>,
) -> Result<Json<Vec<LogEntry>>, AppError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    let entries = db::logs::list_recent(&state.pool, limit).await?;
    Ok(Json(entries))
}

pub async fn summary(
    _auth: AdminAuth,
    State(state): State<SharedState>,
    WithRejection(Query(params), _): WithRejection<Query<SummaryParams>, AppError>,
) -> Result<Json<BTreeMap<LogLevel, i64>>, AppError> {
    let summary = db::logs::level_summary(&state.pool, params.store_id).await?;
    Ok(Json(summary))
}

pub async fn clear(
    _auth: AdminAuth,
    State(state): State<SharedState>,
) -> Result<Json<CleanupOutcome>, AppError> {
    let task = state
        .cleanups
        .get("logs")
        .ok_or_else(|| AppError::Internal("Log cleanup is not registered".to_string()))?;

    let outcome = task.execute(&state.pool, Utc::now()).await.map_err(|e| {
        tracing::error!("An error occurred while clearing the log: {e}");
        AppError::Database(e)
    })?;

    tracing::info!("Manual log clear: {}", outcome.message);
    Ok(Json(outcome))
}
