//! Expenses and monthly receivables

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use ca_common::{Expense, FinancialSetting};
use serde::{Deserialize, Serialize};

use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct ExpensesResponse {
    pub count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReceivableRequest {
    pub manual_receivable: f64,
}

/// PUT /api/expenses
pub async fn set_expenses(
    State(state): State<AppState>,
    Json(expenses): Json<Vec<Expense>>,
) -> ApiResult<Json<ExpensesResponse>> {
    let count = state.orchestrator.set_expenses(expenses).await?;
    Ok(Json(ExpensesResponse { count }))
}

/// GET /api/financial-settings/:month
pub async fn get_financial_setting(
    State(state): State<AppState>,
    Path(month): Path<String>,
) -> ApiResult<Json<FinancialSetting>> {
    state
        .orchestrator
        .financial_setting(&month)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No financial setting for {month}")))
}

/// PUT /api/financial-settings/:month
pub async fn save_financial_setting(
    State(state): State<AppState>,
    Path(month): Path<String>,
    Json(request): Json<SaveReceivableRequest>,
) -> ApiResult<Json<FinancialSetting>> {
    let setting = state
        .orchestrator
        .save_financial_setting(&month, request.manual_receivable)
        .await?;
    Ok(Json(setting))
}

pub fn finance_routes() -> Router<AppState> {
    Router::new()
        .route("/api/expenses", put(set_expenses))
        .route(
            "/api/financial-settings/:month",
            get(get_financial_setting).put(save_financial_setting),
        )
}
