//! Teacher and slot editing

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use ca_common::{ScheduleSlot, Teacher};
use serde::{Deserialize, Serialize};

use crate::sync::NewSlot;
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct AddTeacherRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedResponse {
    pub removed_slots: usize,
}

/// POST /api/teachers
pub async fn add_teacher(
    State(state): State<AppState>,
    Json(request): Json<AddTeacherRequest>,
) -> ApiResult<(StatusCode, Json<Teacher>)> {
    let teacher = state.orchestrator.add_teacher(&request.name).await?;
    Ok((StatusCode::CREATED, Json(teacher)))
}

/// DELETE /api/teachers/:id
pub async fn delete_teacher(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RemovedResponse>> {
    let removed_slots = state.orchestrator.delete_teacher(&id).await?;
    Ok(Json(RemovedResponse { removed_slots }))
}

/// POST /api/slots
pub async fn add_slot(
    State(state): State<AppState>,
    Json(request): Json<NewSlot>,
) -> ApiResult<(StatusCode, Json<ScheduleSlot>)> {
    let slot = state.orchestrator.add_slot(request).await?;
    Ok((StatusCode::CREATED, Json(slot)))
}

/// DELETE /api/slots/:id
pub async fn delete_slot(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.orchestrator.delete_slot(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/slots/manual
pub async fn clear_manual_slots(State(state): State<AppState>) -> ApiResult<Json<RemovedResponse>> {
    let removed_slots = state.orchestrator.clear_manual_slots().await?;
    Ok(Json(RemovedResponse { removed_slots }))
}

pub fn teacher_routes() -> Router<AppState> {
    Router::new()
        .route("/api/teachers", post(add_teacher))
        .route("/api/teachers/:id", delete(delete_teacher))
        .route("/api/slots", post(add_slot))
        .route("/api/slots/manual", delete(clear_manual_slots))
        .route("/api/slots/:id", delete(delete_slot))
}
