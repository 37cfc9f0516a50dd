// Wave Management API Endpoints
// CRUD plus activation lifecycle, all thin pass-throughs to the wave gate

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    models::wave::{CreateWaveRequest, UpdateWaveRequest},
    utils::service_error::ServiceError,
};

/// Create a wave
/// POST /api/v1/waves
pub async fn create_wave(
    State(state): State<AppState>,
    Json(request): Json<CreateWaveRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;

    let wave = state.wave_service.create_wave(request).await?;
    Ok((StatusCode::CREATED, Json(wave)))
}

/// List waves ordered by start position
/// GET /api/v1/waves
pub async fn list_waves(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let waves = state.wave_service.list_waves().await?;
    Ok(Json(waves))
}

/// Fetch one wave
/// GET /api/v1/waves/{id}
pub async fn get_wave(
    State(state): State<AppState>,
    Path(wave_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let wave = state.wave_service.get_wave(wave_id).await?;
    Ok(Json(wave))
}

/// Edit an inactive wave
/// PUT /api/v1/waves/{id}
pub async fn update_wave(
    State(state): State<AppState>,
    Path(wave_id): Path<Uuid>,
    Json(request): Json<UpdateWaveRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;

    let wave = state.wave_service.update_wave(wave_id, request).await?;
    Ok(Json(wave))
}

/// Delete a wave after detaching its users
/// DELETE /api/v1/waves/{id}
pub async fn delete_wave(
    State(state): State<AppState>,
    Path(wave_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let detached = state.wave_service.delete_wave(wave_id).await?;
    Ok(Json(json!({ "deleted": true, "users_detached": detached })))
}

/// Activate a wave, granting access to its rank range
/// POST /api/v1/waves/{id}/activate
pub async fn activate_wave(
    State(state): State<AppState>,
    Path(wave_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let granted = state.wave_service.activate_wave(wave_id).await?;
    Ok(Json(json!({ "activated": true, "users_granted": granted })))
}

/// Deactivate a wave, revoking access from its users
/// POST /api/v1/waves/{id}/deactivate
pub async fn deactivate_wave(
    State(state): State<AppState>,
    Path(wave_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let revoked = state.wave_service.deactivate_wave(wave_id).await?;
    Ok(Json(json!({ "deactivated": true, "users_revoked": revoked })))
}

/// Recompute wave membership for all users
/// POST /api/v1/waves/assign
pub async fn assign_users(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let changed = state.wave_service.assign_users_to_waves().await?;
    Ok(Json(json!({ "users_changed": changed })))
}
