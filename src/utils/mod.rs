// Utility modules

pub mod referral_code;
pub mod referral_validator;
pub mod service_error;

pub use referral_code::{ReferralCodeError, ReferralCodeGenerator};
pub use referral_validator::{validate_referral, ValidationOutcome};
pub use service_error::ServiceError;
