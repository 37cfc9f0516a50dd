// Configuration module
// Fraud-control tunables (IP throttling + referral submission limits)

pub mod fraud;

pub use fraud::{FraudControlConfig, SubmissionLimitConfig, ThrottleConfig};
