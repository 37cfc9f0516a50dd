// Centralized fraud-control configuration
// Per-IP throttle windows and per-referrer submission caps, env-overridable

use serde::{Deserialize, Serialize};

/// Per-IP throttle bounds over sliding windows
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThrottleConfig {
    /// Maximum referral attempts per IP in the trailing hour
    pub max_attempts_per_hour: u32,

    /// Maximum verifications per IP in the trailing 24 hours
    pub max_verifications_per_day: u32,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_attempts_per_hour: std::env::var("THROTTLE_MAX_ATTEMPTS_PER_HOUR")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            max_verifications_per_day: std::env::var("THROTTLE_MAX_VERIFICATIONS_PER_DAY")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .unwrap_or(1),
        }
    }
}

/// Per-referrer submission cap over a sliding 1-hour window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionLimitConfig {
    pub max_submissions_per_hour: u32,
}

impl Default for SubmissionLimitConfig {
    fn default() -> Self {
        Self {
            max_submissions_per_hour: std::env::var("REFERRAL_MAX_SUBMISSIONS_PER_HOUR")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .unwrap_or(15),
        }
    }
}

/// Combined fraud-control configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FraudControlConfig {
    pub throttle: ThrottleConfig,
    pub submissions: SubmissionLimitConfig,
}

impl FraudControlConfig {
    /// Load configuration from environment variables or use defaults
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.throttle.max_attempts_per_hour == 0 {
            return Err("max_attempts_per_hour cannot be zero".to_string());
        }
        if self.throttle.max_verifications_per_day == 0 {
            return Err("max_verifications_per_day cannot be zero".to_string());
        }
        if self.submissions.max_submissions_per_hour == 0 {
            return Err("max_submissions_per_hour cannot be zero".to_string());
        }
        Ok(())
    }
}
