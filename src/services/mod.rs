// Services module for the waitlist/referral core
// Business logic layer for the application

pub mod counters;
pub mod crm;
pub mod email;
pub mod rate_limit;
pub mod referral;
pub mod throttle;
pub mod waitlist;
pub mod wave;

// Re-export commonly used services
pub use counters::{CounterStore, InMemoryCounterStore};
pub use crm::{CrmError, CrmSync, HubSpotClient, NoopCrm};
pub use email::{EmailError, EmailService, NotificationSink};
pub use rate_limit::ReferralRateLimiter;
pub use referral::{ReferralError, ReferralService};
pub use throttle::{IpThrottleLedger, ThrottleDecision};
pub use waitlist::{WaitlistError, WaitlistService};
pub use wave::{WaveError, WaveService};
