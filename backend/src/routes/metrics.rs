//! Prometheus exposition endpoint

use crate::state::AppState;
use axum::{extract::State, http::StatusCode};

/// GET /metrics
///
/// 404 when no recorder was installed (tests, embedded use).
pub async fn render_metrics(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or(StatusCode::NOT_FOUND)
}
