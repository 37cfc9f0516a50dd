// Referral API Endpoints
// Thin pass-throughs over the referral orchestrator and waitlist service

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    models::referral::{CreateReferralRequest, ReferralResponse},
    models::user::{JoinWaitlistRequest, LeaderboardEntry},
    utils::service_error::ServiceError,
};

/// Create a new referral
/// POST /api/v1/referrals
pub async fn create_referral(
    State(state): State<AppState>,
    Json(request): Json<CreateReferralRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;

    let referral = state.referral_service.create_referral(request).await?;
    Ok((StatusCode::CREATED, Json(ReferralResponse::from(referral))))
}

/// Auth-provider webhook payload for signup/verification events
#[derive(Debug, Deserialize, Validate)]
pub struct SignupEventRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,

    pub user_id: Uuid,

    #[serde(default)]
    pub email_verified: bool,
}

/// Run the opportunistic signup validation hook
/// POST /api/v1/referrals/signup-event
pub async fn signup_event(
    State(state): State<AppState>,
    Json(request): Json<SignupEventRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;

    let outcome = state
        .referral_service
        .validate_on_signup(&request.email, request.user_id, request.email_verified)
        .await;
    Ok(Json(outcome))
}

/// Cancel a pending referral (fraud review)
/// POST /api/v1/referrals/{id}/cancel
pub async fn cancel_referral(
    State(state): State<AppState>,
    Path(referral_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let cancelled = state.referral_service.cancel_referral(referral_id).await?;
    Ok(Json(json!({ "cancelled": cancelled })))
}

/// Join the waitlist
/// POST /api/v1/waitlist
pub async fn join_waitlist(
    State(state): State<AppState>,
    Json(request): Json<JoinWaitlistRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;

    let user = state.waitlist_service.join(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub limit: Option<i64>,
}

/// Referral leaderboard
/// GET /api/v1/leaderboard
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let limit = params.limit.unwrap_or(25).clamp(1, 100);
    let users = state.waitlist_service.leaderboard(limit).await?;
    Ok(Json(LeaderboardEntry::from_users(users)))
}

#[derive(Debug, Deserialize)]
pub struct DigestRequest {
    pub period: Option<String>,
}

/// Send the waitlist digest to the configured admin address
/// POST /api/v1/admin/digest
pub async fn send_digest(
    State(state): State<AppState>,
    Json(request): Json<DigestRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let period = request.period.unwrap_or_else(|| "last 7 days".to_string());
    state
        .referral_service
        .send_admin_digest(&state.config.admin_email, &period)
        .await?;
    Ok(Json(json!({ "sent": true })))
}
