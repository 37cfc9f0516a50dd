// IP Throttle Ledger
// Per-IP sliding-window counters answering "may this IP proceed?"

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::config::ThrottleConfig;
use crate::services::counters::CounterStore;

/// Hourly attempt window
fn attempt_window() -> Duration {
    Duration::hours(1)
}

/// Daily verification window
fn verification_window() -> Duration {
    Duration::hours(24)
}

const REASON_ATTEMPTS: &str = "hourly attempt limit reached";
const REASON_VERIFICATIONS: &str = "daily verification limit reached";

/// Outcome of a throttle check
#[derive(Debug, Clone, Serialize)]
pub struct ThrottleDecision {
    pub throttled: bool,
    pub reason: Option<String>,
    pub remaining_attempts: u32,
    pub remaining_verifications: u32,
}

/// Per-IP throttle ledger over an injectable counter store.
///
/// Checking never records and recording never checks, so a caller can
/// check, decide, then record. A check never fails: an IP the store has
/// never seen counts as zero usage.
pub struct IpThrottleLedger {
    counters: Arc<dyn CounterStore>,
    config: ThrottleConfig,
}

impl IpThrottleLedger {
    pub fn new(counters: Arc<dyn CounterStore>, config: ThrottleConfig) -> Self {
        Self { counters, config }
    }

    fn attempts_key(ip: &str) -> String {
        format!("throttle:attempts:{}", ip)
    }

    fn verifications_key(ip: &str) -> String {
        format!("throttle:verifications:{}", ip)
    }

    /// Check both windows for `ip` as of now
    #[instrument(skip(self))]
    pub async fn check(&self, ip: &str) -> ThrottleDecision {
        self.check_at(ip, Utc::now()).await
    }

    /// Check both windows for `ip` as of `now`
    pub async fn check_at(&self, ip: &str, now: DateTime<Utc>) -> ThrottleDecision {
        let attempts = self
            .counters
            .prune_and_count(&Self::attempts_key(ip), now - attempt_window())
            .await as u32;
        let verifications = self
            .counters
            .prune_and_count(&Self::verifications_key(ip), now - verification_window())
            .await as u32;

        let remaining_attempts = self.config.max_attempts_per_hour.saturating_sub(attempts);
        let remaining_verifications = self
            .config
            .max_verifications_per_day
            .saturating_sub(verifications);

        // Attempts bound is checked first; its reason wins when both trip.
        let reason = if attempts >= self.config.max_attempts_per_hour {
            Some(REASON_ATTEMPTS.to_string())
        } else if verifications >= self.config.max_verifications_per_day {
            Some(REASON_VERIFICATIONS.to_string())
        } else {
            None
        };

        if let Some(ref reason) = reason {
            warn!("IP {} throttled: {}", ip, reason);
        }

        ThrottleDecision {
            throttled: reason.is_some(),
            reason,
            remaining_attempts,
            remaining_verifications,
        }
    }

    /// Record an attempt for `ip`; verifications additionally count against
    /// the daily window
    pub async fn record_attempt(&self, ip: &str, is_verification: bool) {
        self.record_attempt_at(ip, is_verification, Utc::now()).await;
    }

    /// Record an attempt with an explicit timestamp
    pub async fn record_attempt_at(&self, ip: &str, is_verification: bool, at: DateTime<Utc>) {
        self.counters.record(&Self::attempts_key(ip), at).await;
        if is_verification {
            self.counters
                .record(&Self::verifications_key(ip), at)
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::counters::InMemoryCounterStore;

    fn ledger() -> IpThrottleLedger {
        IpThrottleLedger::new(
            Arc::new(InMemoryCounterStore::new()),
            ThrottleConfig {
                max_attempts_per_hour: 10,
                max_verifications_per_day: 1,
            },
        )
    }

    #[tokio::test]
    async fn test_unknown_ip_is_not_throttled() {
        let ledger = ledger();
        let decision = ledger.check("198.51.100.7").await;

        assert!(!decision.throttled);
        assert!(decision.reason.is_none());
        assert_eq!(decision.remaining_attempts, 10);
        assert_eq!(decision.remaining_verifications, 1);
    }

    #[tokio::test]
    async fn test_attempts_bound_throttles_at_limit() {
        let ledger = ledger();
        let now = Utc::now();

        for _ in 0..10 {
            ledger.record_attempt_at("10.0.0.1", false, now).await;
        }

        let decision = ledger.check_at("10.0.0.1", now).await;
        assert!(decision.throttled);
        assert_eq!(decision.reason.as_deref(), Some(REASON_ATTEMPTS));
        assert_eq!(decision.remaining_attempts, 0);
    }

    #[tokio::test]
    async fn test_window_expiry_restores_allowance() {
        let ledger = ledger();
        let now = Utc::now();

        for _ in 0..10 {
            ledger
                .record_attempt_at("10.0.0.2", false, now - Duration::minutes(90))
                .await;
        }

        let decision = ledger.check_at("10.0.0.2", now).await;
        assert!(!decision.throttled, "attempts older than 1h must not count");
        assert_eq!(decision.remaining_attempts, 10);
    }

    #[tokio::test]
    async fn test_verification_bound_and_reason_precedence() {
        let ledger = ledger();
        let now = Utc::now();

        // One verification exhausts the daily allowance.
        ledger.record_attempt_at("10.0.0.3", true, now).await;
        let decision = ledger.check_at("10.0.0.3", now).await;
        assert!(decision.throttled);
        assert_eq!(decision.reason.as_deref(), Some(REASON_VERIFICATIONS));
        assert_eq!(decision.remaining_verifications, 0);

        // Exhaust attempts too; the attempts reason takes precedence.
        for _ in 0..9 {
            ledger.record_attempt_at("10.0.0.3", false, now).await;
        }
        let decision = ledger.check_at("10.0.0.3", now).await;
        assert!(decision.throttled);
        assert_eq!(decision.reason.as_deref(), Some(REASON_ATTEMPTS));
    }

    #[tokio::test]
    async fn test_check_has_no_side_effects() {
        let ledger = ledger();
        let now = Utc::now();

        ledger.record_attempt_at("10.0.0.4", false, now).await;
        for _ in 0..20 {
            ledger.check_at("10.0.0.4", now).await;
        }

        let decision = ledger.check_at("10.0.0.4", now).await;
        assert_eq!(
            decision.remaining_attempts, 9,
            "checking must not consume allowance"
        );
    }

    #[tokio::test]
    async fn test_verification_counts_as_attempt() {
        let ledger = ledger();
        let now = Utc::now();

        ledger.record_attempt_at("10.0.0.5", true, now).await;
        let decision = ledger.check_at("10.0.0.5", now).await;
        assert_eq!(decision.remaining_attempts, 9);
    }
}
