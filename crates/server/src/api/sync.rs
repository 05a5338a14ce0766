//! Catalog sync status and manual refresh.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use mediathek_core::SyncStatus;

use super::handlers::{error_response, ErrorResponse};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub message: String,
}

/// GET /sync
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<SyncStatus> {
    Json(state.sync().status())
}

/// POST /sync
///
/// Starts a refresh in the background. Progress is reported over the
/// WebSocket; a request while a cycle is running is rejected.
pub async fn trigger_refresh(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<RefreshResponse>), (StatusCode, Json<ErrorResponse>)> {
    if state.sync().spawn_refresh() {
        info!("Manual catalog refresh started");
        Ok((
            StatusCode::ACCEPTED,
            Json(RefreshResponse {
                message: "Catalog refresh started".to_string(),
            }),
        ))
    } else {
        Err(error_response(
            StatusCode::CONFLICT,
            "A catalog refresh is already running",
        ))
    }
}

/// POST /sync/cancel
pub async fn cancel_refresh(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.sync().is_in_flight() {
        state.sync().cancel();
        info!("Catalog refresh cancelled");
    }
    StatusCode::NO_CONTENT
}
