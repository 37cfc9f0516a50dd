// Record Store abstraction
// Repository traits over the relational store, with a Postgres implementation
// for production and an in-memory implementation for tests and local runs

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::referral::{NewReferral, Referral};
use crate::models::user::{NewWaitlistUser, WaitlistUser};
use crate::models::wave::{NewWave, Wave, WaveChanges};

pub use memory::MemoryStore;
pub use pg::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Conflicting row: {0}")]
    Conflict(String),

    #[error("Row not found")]
    NotFound,
}

impl From<diesel::result::Error> for StoreError {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::NotFound => StoreError::NotFound,
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            ) => StoreError::Conflict(info.message().to_string()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// Referral persistence operations
///
/// Status writes are conditional on the row still being pending, so the
/// pending -> verified | cancelled transitions stay one-directional and the
/// referrer counter is bumped at most once even under concurrent callers.
#[async_trait]
pub trait ReferralStore: Send + Sync {
    async fn insert_referral(&self, new_referral: NewReferral) -> Result<Referral, StoreError>;

    /// Any referral for the `(referrer, email)` pair, regardless of status
    async fn find_referral_by_pair(
        &self,
        referrer_id: Uuid,
        referred_email: &str,
    ) -> Result<Option<Referral>, StoreError>;

    /// Oldest pending referral for a normalized email (earliest `created_at`)
    async fn find_oldest_pending_by_email(
        &self,
        referred_email: &str,
    ) -> Result<Option<Referral>, StoreError>;

    /// Populate `referred_user_id` without touching status
    async fn attach_referred_user(
        &self,
        referral_id: Uuid,
        referred_user_id: Uuid,
    ) -> Result<(), StoreError>;

    /// Atomically flip pending -> verified and bump the referrer's counter
    /// and `last_referral_at`. Returns false when the row was not pending.
    async fn promote_if_pending(&self, referral_id: Uuid) -> Result<bool, StoreError>;

    /// Atomically flip pending -> cancelled. Returns false when not pending.
    async fn cancel_if_pending(&self, referral_id: Uuid) -> Result<bool, StoreError>;

    async fn count_referrals_for(&self, referrer_id: Uuid) -> Result<i64, StoreError>;

    async fn count_referrals_by_status(
        &self,
        status: crate::models::referral::ReferralStatus,
    ) -> Result<i64, StoreError>;
}

/// Wave persistence operations; bulk access flips run inside one transaction
#[async_trait]
pub trait WaveStore: Send + Sync {
    async fn insert_wave(&self, new_wave: NewWave) -> Result<Wave, StoreError>;

    async fn find_wave(&self, wave_id: Uuid) -> Result<Option<Wave>, StoreError>;

    async fn list_waves(&self) -> Result<Vec<Wave>, StoreError>;

    async fn update_wave(&self, wave_id: Uuid, changes: WaveChanges) -> Result<Wave, StoreError>;

    /// Mark the wave active and grant access to every user in its range, in
    /// one transaction. Returns the number of users granted access.
    async fn activate_wave(&self, wave_id: Uuid, at: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Mark the wave inactive and revoke access from its attached users, in
    /// one transaction. Returns the number of users revoked.
    async fn deactivate_wave(&self, wave_id: Uuid) -> Result<u64, StoreError>;

    /// Detach all users referencing the wave, then delete it; both or
    /// neither. Returns the number of users detached.
    async fn delete_wave(&self, wave_id: Uuid) -> Result<u64, StoreError>;

    /// Recompute membership for every user against the given wave ranges.
    /// Users outside all ranges are detached. Returns rows actually changed;
    /// a second run with unchanged inputs returns 0.
    async fn assign_wave_membership(&self, waves: &[Wave]) -> Result<u64, StoreError>;
}

/// Waitlist member persistence operations
#[async_trait]
pub trait WaitlistStore: Send + Sync {
    async fn insert_user(&self, new_user: NewWaitlistUser) -> Result<WaitlistUser, StoreError>;

    async fn find_user(&self, user_id: Uuid) -> Result<Option<WaitlistUser>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<WaitlistUser>, StoreError>;

    async fn find_user_by_referral_code(
        &self,
        referral_code: &str,
    ) -> Result<Option<WaitlistUser>, StoreError>;

    async fn referral_code_exists(&self, referral_code: &str) -> Result<bool, StoreError>;

    async fn count_users(&self) -> Result<i64, StoreError>;

    async fn mark_email_verified(&self, user_id: Uuid) -> Result<(), StoreError>;

    /// Leaderboard read model: referral_count descending, earliest signup
    /// breaking ties
    async fn top_referrers(&self, limit: i64) -> Result<Vec<WaitlistUser>, StoreError>;
}

/// The full record-store surface the services are wired against
pub trait RecordStore: ReferralStore + WaveStore + WaitlistStore {}

impl<T: ReferralStore + WaveStore + WaitlistStore> RecordStore for T {}
