//! Sync triggers and recovery

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;

use crate::merge::ImportDiff;
use crate::sync::{HealReport, SyncStatus};
use crate::{ApiResult, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheckResponse {
    pub has_updates: bool,
}

/// POST /api/sync/emusys
pub async fn sync_emusys(State(state): State<AppState>) -> ApiResult<Json<ImportDiff>> {
    Ok(Json(state.orchestrator.sync_from_lesson_api().await?))
}

/// POST /api/sync/check
pub async fn check_updates(State(state): State<AppState>) -> ApiResult<Json<UpdateCheckResponse>> {
    let has_updates = state.orchestrator.check_for_updates().await?;
    Ok(Json(UpdateCheckResponse { has_updates }))
}

/// POST /api/sync/heal
pub async fn heal(State(state): State<AppState>) -> ApiResult<Json<HealReport>> {
    Ok(Json(state.orchestrator.heal_remote().await?))
}

/// POST /api/reset
///
/// Usable in every phase; the recovery path out of FAILED.
pub async fn reset(State(state): State<AppState>) -> ApiResult<Json<SyncStatus>> {
    state.orchestrator.reset().await?;
    Ok(Json(state.orchestrator.status().await))
}

pub fn sync_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sync/emusys", post(sync_emusys))
        .route("/api/sync/check", post(check_updates))
        .route("/api/sync/heal", post(heal))
        .route("/api/reset", post(reset))
}
