use axum::extract::{Path, Query, State};
use axum::Json;
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::AdminAuth;
use crate::cleanup::CleanupOutcome;
use crate::db;
use crate::db::queue::{QueueFilter, QueueSummaryReader};
use crate::error::AppError;
use crate::models::{QueueRecord, QueueStatus, QueueSummary};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct SummaryParams {
    pub store_id: Option<i32>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub updated_before: Option<DateTime<Utc>>,
}

impl SummaryParams {
    fn filter(&self) -> Result<QueueFilter, AppError> {
        if let (Some(after), Some(before)) = (self.created_after, self.created_before) {
            if after >= before {
                return Err(AppError::BadRequest(
                    "created_after must be earlier than created_before".to_string(),
                ));
            }
        }

        Ok(QueueFilter {
            store_id: self.store_id,
            created_after: self.created_after,
            created_before: self.created_before,
            updated_before: self.updated_before,
            ..QueueFilter::default()
        })
    }
}

#[derive(Deserialize)]
pub struct CountParams {
    pub status: String,
    pub store_id: Option<i32>,
}

pub async fn summary(
    _auth: AdminAuth,
    State(state): State<SharedState>,
    WithRejection(Query(params), _): WithRejection<Query<SummaryParams>, AppError>,
) -> Result<Json<QueueSummary>, AppError> {
    let reader = QueueSummaryReader::new(&state.pool)
        .with_filter(params.filter()?)
        .with_stale_after(state.config.stale_after());

    let summary = reader.snapshot().await?;
    Ok(Json(summary))
}

pub async fn count(
    _auth: AdminAuth,
    State(state): State<SharedState>,
    WithRejection(Query(params), _): WithRejection<Query<CountParams>, AppError>,
) -> Result<Json<serde_json::Value>, AppError> {
    let status: QueueStatus = params.status.parse().map_err(AppError::BadRequest)?;

    let filter = QueueFilter {
        store_id: params.store_id,
        ..QueueFilter::default()
    };

    let count = QueueSummaryReader::new(&state.pool)
        .with_filter(filter)
        .count_by_status(status)
        .await?;

    Ok(Json(serde_json::json!({
        "status": status,
        "count": count,
    })))
}

pub async fn get(
    _auth: AdminAuth,
    State(state): State<SharedState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<QueueRecord>, AppError> {
    let record = db::queue::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Queue record not found".to_string()))?;
    Ok(Json(record))
}

pub async fn clear(
    _auth: AdminAuth,
    State(state): State<SharedState>,
) -> Result<Json<CleanupOutcome>, AppError> {
    let task = state
        .cleanups
        .get("queue")
        .ok_or_else(|| AppError::Internal("Queue cleanup is not registered".to_string()))?;

    let outcome = task.execute(&state.pool, Utc::now()).await.map_err(|e| {
        tracing::error!("An error occurred while clearing the queue: {e}");
        AppError::Database(e)
    })?;

    tracing::info!("Manual queue clear: {}", outcome.message);
    Ok(Json(outcome))
}
