// Service error type: one HTTP translation layer for all core errors
// Deterministic pre-condition failures map to 4xx; store failures stay 500
// with details logged server-side only

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::referral::ReferralError;
use crate::services::waitlist::WaitlistError;
use crate::services::wave::WaveError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Validation failed")]
    ValidationError(Vec<String>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Throttled: {reason}")]
    Throttled {
        reason: String,
        remaining_attempts: u32,
        remaining_verifications: u32,
    },

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Referral already exists")]
    DuplicateReferral,

    #[error("Email already on the waitlist")]
    EmailTaken,

    #[error("Not found")]
    NotFound,

    #[error("Active waves cannot be modified")]
    ActiveWaveImmutable,

    #[error("Invalid wave position range")]
    InvalidWaveRange,

    #[error("Internal server error")]
    InternalError,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ServiceError::DatabaseError(message) => {
                // Details are for the logs, not the wire.
                tracing::error!("Store failure surfaced to handler: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            },
            ServiceError::ValidationError(reasons) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Validation failed", "reasons": reasons }),
            ),
            ServiceError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            },
            ServiceError::Throttled {
                reason,
                remaining_attempts,
                remaining_verifications,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({
                    "error": reason,
                    "remaining_attempts": remaining_attempts,
                    "remaining_verifications": remaining_verifications,
                }),
            ),
            ServiceError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "error": "rate limit exceeded" }),
            ),
            ServiceError::DuplicateReferral => (
                StatusCode::CONFLICT,
                json!({ "error": "referral already exists" }),
            ),
            ServiceError::EmailTaken => (
                StatusCode::CONFLICT,
                json!({ "error": "Email already on the waitlist" }),
            ),
            ServiceError::NotFound => {
                (StatusCode::NOT_FOUND, json!({ "error": "Resource not found" }))
            },
            ServiceError::ActiveWaveImmutable => (
                StatusCode::CONFLICT,
                json!({ "error": "Deactivate the wave before editing it" }),
            ),
            ServiceError::InvalidWaveRange => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "start_position must not exceed end_position" }),
            ),
            ServiceError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal server error" }),
            ),
        };

        let status_code = status.as_u16();
        let mut body = body;
        body["status"] = json!(status_code);

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => ServiceError::NotFound,
            other => ServiceError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ReferralError> for ServiceError {
    fn from(error: ReferralError) -> Self {
        match error {
            ReferralError::Validation(reasons) => ServiceError::ValidationError(reasons),
            ReferralError::Throttled {
                reason,
                remaining_attempts,
                remaining_verifications,
            } => ServiceError::Throttled {
                reason,
                remaining_attempts,
                remaining_verifications,
            },
            ReferralError::RateLimited => ServiceError::RateLimited,
            ReferralError::Duplicate => ServiceError::DuplicateReferral,
            ReferralError::Store(store_error) => store_error.into(),
        }
    }
}

impl From<WaveError> for ServiceError {
    fn from(error: WaveError) -> Self {
        match error {
            WaveError::NotFound => ServiceError::NotFound,
            WaveError::ActiveWaveImmutable => ServiceError::ActiveWaveImmutable,
            WaveError::InvalidRange => ServiceError::InvalidWaveRange,
            WaveError::Store(store_error) => store_error.into(),
        }
    }
}

impl From<WaitlistError> for ServiceError {
    fn from(error: WaitlistError) -> Self {
        match error {
            WaitlistError::EmailTaken => ServiceError::EmailTaken,
            WaitlistError::CodeGeneration(e) => ServiceError::DatabaseError(e.to_string()),
            WaitlistError::Store(store_error) => store_error.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(error: validator::ValidationErrors) -> Self {
        let reasons = error
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| match e.message {
                    Some(ref message) => message.to_string(),
                    None => format!("invalid value for {}", field),
                })
            })
            .collect();
        ServiceError::ValidationError(reasons)
    }
}
