// Application state and configuration
use std::sync::Arc;

use crate::{
    app_config::AppConfig,
    db::DieselPool,
    services::{IpThrottleLedger, ReferralService, WaitlistService, WaveService},
};

// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub diesel_pool: DieselPool,
    pub throttle: Arc<IpThrottleLedger>,
    pub referral_service: Arc<ReferralService>,
    pub waitlist_service: Arc<WaitlistService>,
    pub wave_service: Arc<WaveService>,
    pub max_connections: u32,
}
