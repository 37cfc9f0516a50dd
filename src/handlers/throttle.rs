// Throttle Status Endpoint
// Exposes the per-IP throttle decision for admin fraud review

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use crate::app::AppState;

/// Current throttle decision for an IP
/// GET /api/v1/throttle/{ip}
pub async fn throttle_status(
    State(state): State<AppState>,
    Path(ip): Path<String>,
) -> impl IntoResponse {
    let decision = state.throttle.check(&ip).await;
    Json(decision)
}
