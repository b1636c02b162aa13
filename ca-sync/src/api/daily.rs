//! Per-day status: confirmations, contacts and hidden slots

use axum::{
    extract::{Path, State},
    routing::{delete, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{ApiResult, AppState};

/// A slot on a given date
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySlotRequest {
    pub date: String,
    pub slot_id: String,
}

#[derive(Debug, Serialize)]
pub struct ConfirmedResponse {
    pub confirmed: bool,
}

#[derive(Debug, Serialize)]
pub struct ContactedResponse {
    /// False when the student had already been marked
    pub added: bool,
}

#[derive(Debug, Serialize)]
pub struct HiddenResponse {
    pub hidden: bool,
}

#[derive(Debug, Serialize)]
pub struct ClearedResponse {
    pub cleared: usize,
}

/// POST /api/confirmations/toggle
pub async fn toggle_confirmation(
    State(state): State<AppState>,
    Json(request): Json<DaySlotRequest>,
) -> ApiResult<Json<ConfirmedResponse>> {
    let confirmed = state
        .orchestrator
        .toggle_confirmation(&request.date, &request.slot_id)
        .await?;
    Ok(Json(ConfirmedResponse { confirmed }))
}

/// DELETE /api/confirmations/:date
pub async fn clear_day(State(state): State<AppState>, Path(date): Path<String>) -> ApiResult<Json<ClearedResponse>> {
    let cleared = state.orchestrator.clear_day(&date).await?;
    Ok(Json(ClearedResponse { cleared }))
}

/// POST /api/contacts
pub async fn mark_contacted(
    State(state): State<AppState>,
    Json(request): Json<DaySlotRequest>,
) -> ApiResult<Json<ContactedResponse>> {
    let added = state
        .orchestrator
        .mark_contacted(&request.date, &request.slot_id)
        .await?;
    Ok(Json(ContactedResponse { added }))
}

/// POST /api/overrides/toggle
pub async fn toggle_hidden(
    State(state): State<AppState>,
    Json(request): Json<DaySlotRequest>,
) -> ApiResult<Json<HiddenResponse>> {
    let hidden = state
        .orchestrator
        .toggle_hidden(&request.date, &request.slot_id)
        .await?;
    Ok(Json(HiddenResponse { hidden }))
}

pub fn daily_routes() -> Router<AppState> {
    Router::new()
        .route("/api/confirmations/toggle", post(toggle_confirmation))
        .route("/api/confirmations/:date", delete(clear_day))
        .route("/api/contacts", post(mark_contacted))
        .route("/api/overrides/toggle", post(toggle_hidden))
}
