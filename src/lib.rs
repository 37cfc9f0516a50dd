// Library exports for the waitlist/referral core
// This file exposes modules and functions for library consumers

pub mod app;
pub mod app_config;
pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod schema;
pub mod services;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use app::AppState;
pub use app_config::{AppConfig, CONFIG};
pub use config::{FraudControlConfig, SubmissionLimitConfig, ThrottleConfig};
pub use db::{DieselDatabaseConfig, DieselPool};
pub use models::referral::{Referral, ReferralStatus, SignupValidation};
pub use models::user::WaitlistUser;
pub use models::wave::Wave;
pub use services::{
    EmailService, InMemoryCounterStore, IpThrottleLedger, ReferralRateLimiter, ReferralService,
    ThrottleDecision, WaitlistService, WaveService,
};
pub use store::{MemoryStore, PgStore, RecordStore, StoreError};
pub use utils::service_error::ServiceError;

use std::sync::Arc;
use tracing::info;

/// Build the API router over an initialized state; the health endpoint is
/// mounted separately at the server root
pub fn api_router() -> axum::Router<AppState> {
    axum::Router::new()
        .merge(handlers::referral_routes())
        .merge(handlers::wave_routes())
}

// Library initialization function for external consumers
pub async fn initialize_app_state() -> Result<AppState, Box<dyn std::error::Error>> {
    // Load environment
    dotenv::dotenv().ok();

    // Initialize config
    let config = app_config::config();

    // Initialize database pool
    info!("Initializing database pool...");
    let db_config = db::DieselDatabaseConfig::default();
    let max_connections = db_config.max_connections;
    let diesel_pool = db::create_diesel_pool(db_config).await?;

    // Run migrations if enabled
    if db::should_run_migrations() {
        info!("Running embedded migrations...");
        db::run_migrations()
            .await
            .map_err(|e| format!("Migration failed: {}", e))?;
    }

    Ok(build_app_state(config.clone(), diesel_pool, max_connections)?)
}

/// Wire services over an existing pool; split out so tests and alternate
/// binaries can assemble state without touching the environment
pub fn build_app_state(
    config: AppConfig,
    diesel_pool: DieselPool,
    max_connections: u32,
) -> Result<AppState, Box<dyn std::error::Error>> {
    use services::{CrmSync, HubSpotClient, NoopCrm};

    let store: Arc<dyn RecordStore> = Arc::new(PgStore::new(diesel_pool.clone()));

    let counters = Arc::new(InMemoryCounterStore::new());
    let fraud_config = FraudControlConfig::from_env();
    fraud_config.validate().map_err(|e| format!("Invalid fraud config: {}", e))?;

    let throttle = Arc::new(IpThrottleLedger::new(
        counters.clone(),
        fraud_config.throttle.clone(),
    ));
    let rate_limiter = Arc::new(ReferralRateLimiter::new(
        counters,
        fraud_config.submissions.clone(),
    ));

    let email_service = Arc::new(EmailService::new(config.email.clone())?);
    let crm: Arc<dyn CrmSync> = if config.crm.enabled {
        Arc::new(HubSpotClient::new(&config.crm))
    } else {
        Arc::new(NoopCrm)
    };

    let referral_service = Arc::new(ReferralService::new(
        store.clone(),
        throttle.clone(),
        rate_limiter,
        email_service,
        crm.clone(),
    ));
    let waitlist_service = Arc::new(WaitlistService::new(
        store.clone(),
        referral_service.clone(),
        crm,
    ));
    let wave_service = Arc::new(WaveService::new(store));

    Ok(AppState {
        config: Arc::new(config),
        diesel_pool,
        throttle,
        referral_service,
        waitlist_service,
        wave_service,
        max_connections,
    })
}

// Health check handler
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    use axum::http::StatusCode;
    use axum::Json;

    let mut overall_healthy = true;
    let timestamp = chrono::Utc::now().to_rfc3339();

    let postgres_health = match db::check_diesel_health(&state.diesel_pool).await {
        Ok(_) => serde_json::json!({
            "status": "healthy",
            "max_connections": state.max_connections,
            "error": null
        }),
        Err(e) => {
            overall_healthy = false;
            serde_json::json!({
                "status": "unhealthy",
                "error": format!("Database connection failed: {}", e)
            })
        },
    };

    let response = serde_json::json!({
        "status": if overall_healthy { "healthy" } else { "degraded" },
        "service": "waitlist-core",
        "timestamp": timestamp,
        "components": {
            "postgresql": postgres_health,
        }
    });

    if overall_healthy {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
