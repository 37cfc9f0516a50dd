// Data models for the waitlist/referral core

pub mod referral;
pub mod user;
pub mod wave;

pub use referral::{
    CreateReferralRequest, NewReferral, Referral, ReferralResponse, ReferralStatus,
    SignupValidation,
};
pub use user::{JoinWaitlistRequest, LeaderboardEntry, NewWaitlistUser, WaitlistUser};
pub use wave::{CreateWaveRequest, NewWave, UpdateWaveRequest, Wave, WaveChanges};
