// Referral Rate Limiter
// Per-referrer submission counters over a sliding 1-hour window

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::config::SubmissionLimitConfig;
use crate::services::counters::CounterStore;

fn submission_window() -> Duration {
    Duration::hours(1)
}

/// Per-referrer submission limiter, same prune-then-compare algorithm as the
/// IP throttle ledger but scoped by user id
pub struct ReferralRateLimiter {
    counters: Arc<dyn CounterStore>,
    config: SubmissionLimitConfig,
}

impl ReferralRateLimiter {
    pub fn new(counters: Arc<dyn CounterStore>, config: SubmissionLimitConfig) -> Self {
        Self { counters, config }
    }

    fn key(referrer_id: &str) -> String {
        format!("rate_limit:submissions:{}", referrer_id)
    }

    /// Whether `referrer_id` may register another referral right now
    #[instrument(skip(self))]
    pub async fn can_submit(&self, referrer_id: &str) -> bool {
        self.can_submit_at(referrer_id, Utc::now()).await
    }

    pub async fn can_submit_at(&self, referrer_id: &str, now: DateTime<Utc>) -> bool {
        let allowed = self.remaining_at(referrer_id, now).await > 0;
        if !allowed {
            warn!("Referrer {} exceeded the submission window", referrer_id);
        }
        allowed
    }

    /// Submissions left in the current window
    pub async fn remaining(&self, referrer_id: &str) -> u32 {
        self.remaining_at(referrer_id, Utc::now()).await
    }

    pub async fn remaining_at(&self, referrer_id: &str, now: DateTime<Utc>) -> u32 {
        let used = self
            .counters
            .prune_and_count(&Self::key(referrer_id), now - submission_window())
            .await as u32;
        self.config.max_submissions_per_hour.saturating_sub(used)
    }

    /// Record a successful submission for `referrer_id`
    pub async fn record_submission(&self, referrer_id: &str) {
        self.record_submission_at(referrer_id, Utc::now()).await;
    }

    pub async fn record_submission_at(&self, referrer_id: &str, at: DateTime<Utc>) {
        self.counters.record(&Self::key(referrer_id), at).await;
    }
}
