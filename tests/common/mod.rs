// Shared test harness: the full service stack wired over the in-memory
// store, with a recording email sink and a disabled CRM.
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use waitlist_core::app_config::EmailConfig;
use waitlist_core::config::{SubmissionLimitConfig, ThrottleConfig};
use waitlist_core::models::user::{NewWaitlistUser, WaitlistUser};
use waitlist_core::services::email::{EmailError, EmailMessage, EmailService, NotificationSink};
use waitlist_core::services::{
    InMemoryCounterStore, IpThrottleLedger, NoopCrm, ReferralRateLimiter, ReferralService,
    WaitlistService, WaveService,
};
use waitlist_core::store::{MemoryStore, WaitlistStore};

/// Email sink that records instead of delivering
#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        self.sent.lock().await.push(message);
        Ok(())
    }
}

pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub throttle: Arc<IpThrottleLedger>,
    pub rate_limiter: Arc<ReferralRateLimiter>,
    pub referrals: Arc<ReferralService>,
    pub waitlist: WaitlistService,
    pub waves: WaveService,
    pub sink: Arc<RecordingSink>,
}

pub fn email_config() -> EmailConfig {
    EmailConfig {
        resend_api_key: "test_key".to_string(),
        resend_api_url: "https://api.resend.com/emails".to_string(),
        from_email: "noreply@test.com".to_string(),
        from_name: "Test Waitlist".to_string(),
        support_email: "support@test.com".to_string(),
        frontend_url: "https://app.test.com".to_string(),
    }
}

/// Full stack over a fresh in-memory store with explicit (non-env) limits
pub fn harness() -> TestHarness {
    harness_with_limits(10, 1, 15)
}

pub fn harness_with_limits(
    max_attempts_per_hour: u32,
    max_verifications_per_day: u32,
    max_submissions_per_hour: u32,
) -> TestHarness {
    let store = Arc::new(MemoryStore::new());
    let counters = Arc::new(InMemoryCounterStore::new());

    let throttle = Arc::new(IpThrottleLedger::new(
        counters.clone(),
        ThrottleConfig {
            max_attempts_per_hour,
            max_verifications_per_day,
        },
    ));
    let rate_limiter = Arc::new(ReferralRateLimiter::new(
        counters,
        SubmissionLimitConfig {
            max_submissions_per_hour,
        },
    ));

    let sink = Arc::new(RecordingSink::default());
    let email = Arc::new(EmailService::with_sink(email_config(), sink.clone()).unwrap());

    let referrals = Arc::new(ReferralService::new(
        store.clone(),
        throttle.clone(),
        rate_limiter.clone(),
        email,
        Arc::new(NoopCrm),
    ));
    let waitlist = WaitlistService::new(store.clone(), referrals.clone(), Arc::new(NoopCrm));
    let waves = WaveService::new(store.clone());

    TestHarness {
        store,
        throttle,
        rate_limiter,
        referrals,
        waitlist,
        waves,
        sink,
    }
}

/// Insert a waitlist member directly into the store
pub async fn seed_user(
    store: &Arc<MemoryStore>,
    email: &str,
    referral_code: &str,
    position: i32,
) -> WaitlistUser {
    store
        .insert_user(NewWaitlistUser::at_position(
            email.to_string(),
            referral_code.to_string(),
            position,
        ))
        .await
        .expect("seed user")
}
