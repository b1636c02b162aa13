//! ca-sync library interface
//!
//! The ConfirmAula sync service: teacher identity reconciliation, the merge
//! engine, the sync orchestrator and its HTTP API. Exposed as a library for
//! integration testing.

pub mod api;
pub mod error;
pub mod identity;
pub mod merge;
pub mod schedule;
pub mod stores;
pub mod sync;

pub use crate::error::{ApiError, ApiResult};
pub use crate::sync::{SyncError, SyncOrchestrator};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SyncOrchestrator>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(orchestrator: Arc<SyncOrchestrator>) -> Self {
        Self {
            orchestrator,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::health_routes())
        .merge(api::status_routes())
        .merge(api::teacher_routes())
        .merge(api::daily_routes())
        .merge(api::finance_routes())
        .merge(api::sync_routes())
        .route("/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
