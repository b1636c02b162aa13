//! Read-only views of the in-memory state

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use ca_common::LocalSnapshot;
use serde::Deserialize;

use crate::schedule::DaySchedule;
use crate::sync::SyncStatus;
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub teacher_id: Option<String>,
}

/// GET /api/status
///
/// Answers in every phase, FAILED included.
pub async fn get_status(State(state): State<AppState>) -> Json<SyncStatus> {
    Json(state.orchestrator.status().await)
}

/// GET /api/snapshot
pub async fn get_snapshot(State(state): State<AppState>) -> ApiResult<Json<LocalSnapshot>> {
    Ok(Json(state.orchestrator.snapshot().await?))
}

/// GET /api/day/:date?teacher_id=
pub async fn get_day(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Query(query): Query<DayQuery>,
) -> ApiResult<Json<DaySchedule>> {
    let day = state
        .orchestrator
        .day_schedule(&date, query.teacher_id.as_deref())
        .await?;
    Ok(Json(day))
}

pub fn status_routes() -> Router<AppState> {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/day/:date", get(get_day))
}
