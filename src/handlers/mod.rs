// HTTP handlers module
// Route builders compose the thin pass-through endpoints per resource

pub mod referrals;
pub mod throttle;
pub mod waves;

use axum::routing::{get, post};
use axum::Router;

use crate::app::AppState;

/// Referral + waitlist routes
pub fn referral_routes() -> Router<AppState> {
    Router::new()
        .route("/referrals", post(referrals::create_referral))
        .route("/referrals/signup-event", post(referrals::signup_event))
        .route(
            "/referrals/{id}/cancel",
            post(referrals::cancel_referral),
        )
        .route("/waitlist", post(referrals::join_waitlist))
        .route("/leaderboard", get(referrals::leaderboard))
        .route("/admin/digest", post(referrals::send_digest))
        .route("/throttle/{ip}", get(throttle::throttle_status))
}

/// Wave management routes
pub fn wave_routes() -> Router<AppState> {
    Router::new()
        .route("/waves", post(waves::create_wave).get(waves::list_waves))
        .route("/waves/assign", post(waves::assign_users))
        .route(
            "/waves/{id}",
            get(waves::get_wave)
                .put(waves::update_wave)
                .delete(waves::delete_wave),
        )
        .route("/waves/{id}/activate", post(waves::activate_wave))
        .route("/waves/{id}/deactivate", post(waves::deactivate_wave))
}
