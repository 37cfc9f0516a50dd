// In-memory record store
// Backs the test suite and local runs; one async mutex over all tables keeps
// the conditional status transition atomic the same way the SQL store does

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::referral::{NewReferral, Referral, ReferralStatus};
use crate::models::user::{NewWaitlistUser, WaitlistUser};
use crate::models::wave::{NewWave, Wave, WaveChanges};
use crate::store::{ReferralStore, StoreError, WaitlistStore, WaveStore};

#[derive(Default)]
struct MemoryTables {
    referrals: Vec<Referral>,
    waves: Vec<Wave>,
    users: Vec<WaitlistUser>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<MemoryTables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn referral_from_new(new_referral: NewReferral) -> Referral {
    Referral {
        id: new_referral.id,
        referrer_id: new_referral.referrer_id,
        referred_email: new_referral.referred_email,
        referred_user_id: new_referral.referred_user_id,
        referred_ip: new_referral.referred_ip,
        status: new_referral.status,
        created_at: new_referral.created_at,
        updated_at: new_referral.updated_at,
    }
}

fn wave_from_new(new_wave: NewWave) -> Wave {
    Wave {
        id: new_wave.id,
        name: new_wave.name,
        description: new_wave.description,
        start_position: new_wave.start_position,
        end_position: new_wave.end_position,
        is_active: new_wave.is_active,
        activated_at: new_wave.activated_at,
        created_at: new_wave.created_at,
        updated_at: new_wave.updated_at,
    }
}

fn user_from_new(new_user: NewWaitlistUser) -> WaitlistUser {
    WaitlistUser {
        id: new_user.id,
        email: new_user.email,
        referral_code: new_user.referral_code,
        waitlist_position: new_user.waitlist_position,
        wave_id: new_user.wave_id,
        access_granted: new_user.access_granted,
        email_verified: new_user.email_verified,
        referral_count: new_user.referral_count,
        last_referral_at: new_user.last_referral_at,
        created_at: new_user.created_at,
        updated_at: new_user.updated_at,
    }
}

#[async_trait]
impl ReferralStore for MemoryStore {
    async fn insert_referral(&self, new_referral: NewReferral) -> Result<Referral, StoreError> {
        let mut tables = self.tables.lock().await;

        if tables.referrals.iter().any(|r| {
            r.referrer_id == new_referral.referrer_id
                && r.referred_email == new_referral.referred_email
        }) {
            return Err(StoreError::Conflict(
                "duplicate (referrer, email) pair".to_string(),
            ));
        }

        let referral = referral_from_new(new_referral);
        tables.referrals.push(referral.clone());
        Ok(referral)
    }

    async fn find_referral_by_pair(
        &self,
        referrer_id: Uuid,
        referred_email: &str,
    ) -> Result<Option<Referral>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .referrals
            .iter()
            .find(|r| r.referrer_id == referrer_id && r.referred_email == referred_email)
            .cloned())
    }

    async fn find_oldest_pending_by_email(
        &self,
        referred_email: &str,
    ) -> Result<Option<Referral>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .referrals
            .iter()
            .filter(|r| r.is_pending() && r.referred_email == referred_email)
            .min_by_key(|r| r.created_at)
            .cloned())
    }

    async fn attach_referred_user(
        &self,
        referral_id: Uuid,
        referred_user_id: Uuid,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let referral = tables
            .referrals
            .iter_mut()
            .find(|r| r.id == referral_id)
            .ok_or(StoreError::NotFound)?;
        referral.referred_user_id = Some(referred_user_id);
        referral.updated_at = Utc::now();
        Ok(())
    }

    async fn promote_if_pending(&self, referral_id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();

        // Check and flip under one lock hold; the loser of a race sees a
        // non-pending row and bumps nothing.
        let referrer_id = {
            let referral = tables
                .referrals
                .iter_mut()
                .find(|r| r.id == referral_id)
                .ok_or(StoreError::NotFound)?;
            if !referral.is_pending() {
                return Ok(false);
            }
            referral.status = ReferralStatus::Verified.as_str().to_string();
            referral.updated_at = now;
            referral.referrer_id
        };

        if let Some(user) = tables.users.iter_mut().find(|u| u.id == referrer_id) {
            user.referral_count += 1;
            user.last_referral_at = Some(now);
            user.updated_at = now;
        }

        Ok(true)
    }

    async fn cancel_if_pending(&self, referral_id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        let referral = tables
            .referrals
            .iter_mut()
            .find(|r| r.id == referral_id)
            .ok_or(StoreError::NotFound)?;

        if !referral.is_pending() {
            return Ok(false);
        }
        referral.status = ReferralStatus::Cancelled.as_str().to_string();
        referral.updated_at = Utc::now();
        Ok(true)
    }

    async fn count_referrals_for(&self, referrer_id: Uuid) -> Result<i64, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .referrals
            .iter()
            .filter(|r| r.referrer_id == referrer_id)
            .count() as i64)
    }

    async fn count_referrals_by_status(
        &self,
        status: ReferralStatus,
    ) -> Result<i64, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .referrals
            .iter()
            .filter(|r| r.status() == status)
            .count() as i64)
    }
}

#[async_trait]
impl WaveStore for MemoryStore {
    async fn insert_wave(&self, new_wave: NewWave) -> Result<Wave, StoreError> {
        let mut tables = self.tables.lock().await;
        let wave = wave_from_new(new_wave);
        tables.waves.push(wave.clone());
        Ok(wave)
    }

    async fn find_wave(&self, wave_id: Uuid) -> Result<Option<Wave>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.waves.iter().find(|w| w.id == wave_id).cloned())
    }

    async fn list_waves(&self) -> Result<Vec<Wave>, StoreError> {
        let tables = self.tables.lock().await;
        let mut waves = tables.waves.clone();
        waves.sort_by_key(|w| w.start_position);
        Ok(waves)
    }

    async fn update_wave(&self, wave_id: Uuid, changes: WaveChanges) -> Result<Wave, StoreError> {
        let mut tables = self.tables.lock().await;
        let wave = tables
            .waves
            .iter_mut()
            .find(|w| w.id == wave_id)
            .ok_or(StoreError::NotFound)?;

        if let Some(name) = changes.name {
            wave.name = name;
        }
        if let Some(description) = changes.description {
            wave.description = description;
        }
        if let Some(start_position) = changes.start_position {
            wave.start_position = start_position;
        }
        if let Some(end_position) = changes.end_position {
            wave.end_position = end_position;
        }
        wave.updated_at = changes.updated_at.unwrap_or_else(Utc::now);
        Ok(wave.clone())
    }

    async fn activate_wave(&self, wave_id: Uuid, at: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        let (start, end) = {
            let wave = tables
                .waves
                .iter_mut()
                .find(|w| w.id == wave_id)
                .ok_or(StoreError::NotFound)?;
            wave.is_active = true;
            wave.activated_at = Some(at);
            wave.updated_at = at;
            (wave.start_position, wave.end_position)
        };

        let mut granted = 0u64;
        for user in tables
            .users
            .iter_mut()
            .filter(|u| u.waitlist_position >= start && u.waitlist_position <= end)
        {
            user.wave_id = Some(wave_id);
            user.access_granted = true;
            user.updated_at = at;
            granted += 1;
        }
        Ok(granted)
    }

    async fn deactivate_wave(&self, wave_id: Uuid) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        {
            let wave = tables
                .waves
                .iter_mut()
                .find(|w| w.id == wave_id)
                .ok_or(StoreError::NotFound)?;
            wave.is_active = false;
            wave.activated_at = None;
            wave.updated_at = now;
        }

        let mut revoked = 0u64;
        for user in tables
            .users
            .iter_mut()
            .filter(|u| u.wave_id == Some(wave_id) && u.access_granted)
        {
            user.access_granted = false;
            user.updated_at = now;
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn delete_wave(&self, wave_id: Uuid) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        if !tables.waves.iter().any(|w| w.id == wave_id) {
            return Err(StoreError::NotFound);
        }

        let now = Utc::now();
        let mut detached = 0u64;
        for user in tables.users.iter_mut().filter(|u| u.wave_id == Some(wave_id)) {
            user.wave_id = None;
            user.access_granted = false;
            user.updated_at = now;
            detached += 1;
        }

        tables.waves.retain(|w| w.id != wave_id);
        Ok(detached)
    }

    async fn assign_wave_membership(&self, waves: &[Wave]) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();

        let mut changed = 0u64;
        for user in tables.users.iter_mut() {
            let target = waves.iter().find(|w| w.covers(user.waitlist_position));
            let (wave_id, access) = match target {
                Some(wave) => (Some(wave.id), wave.is_active),
                None => (None, false),
            };

            if user.wave_id == wave_id && user.access_granted == access {
                continue;
            }
            user.wave_id = wave_id;
            user.access_granted = access;
            user.updated_at = now;
            changed += 1;
        }
        Ok(changed)
    }
}

#[async_trait]
impl WaitlistStore for MemoryStore {
    async fn insert_user(&self, new_user: NewWaitlistUser) -> Result<WaitlistUser, StoreError> {
        let mut tables = self.tables.lock().await;

        if tables.users.iter().any(|u| u.email == new_user.email) {
            return Err(StoreError::Conflict("duplicate email".to_string()));
        }
        if tables
            .users
            .iter()
            .any(|u| u.referral_code == new_user.referral_code)
        {
            return Err(StoreError::Conflict("duplicate referral code".to_string()));
        }

        let user = user_from_new(new_user);
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<WaitlistUser>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<WaitlistUser>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_referral_code(
        &self,
        referral_code: &str,
    ) -> Result<Option<WaitlistUser>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.referral_code == referral_code)
            .cloned())
    }

    async fn referral_code_exists(&self, referral_code: &str) -> Result<bool, StoreError> {
        Ok(self
            .find_user_by_referral_code(referral_code)
            .await?
            .is_some())
    }

    async fn count_users(&self) -> Result<i64, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.len() as i64)
    }

    async fn mark_email_verified(&self, user_id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(StoreError::NotFound)?;
        user.email_verified = true;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn top_referrers(&self, limit: i64) -> Result<Vec<WaitlistUser>, StoreError> {
        let tables = self.tables.lock().await;
        let mut users = tables.users.clone();
        users.sort_by(|a, b| {
            b.referral_count
                .cmp(&a.referral_count)
                .then(a.created_at.cmp(&b.created_at))
        });
        users.truncate(limit.max(0) as usize);
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_rejects_duplicate_pair() {
        let store = MemoryStore::new();
        let referrer = Uuid::new_v4();

        store
            .insert_referral(NewReferral::pending(
                referrer,
                "friend@example.com".to_string(),
                None,
            ))
            .await
            .unwrap();

        let duplicate = store
            .insert_referral(NewReferral::pending(
                referrer,
                "friend@example.com".to_string(),
                None,
            ))
            .await;
        assert!(matches!(duplicate, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_promote_is_one_shot() {
        let store = MemoryStore::new();
        let referrer = user_from_new(NewWaitlistUser::at_position(
            "owner@example.com".to_string(),
            "OWNER123".to_string(),
            1,
        ));
        let referrer_id = referrer.id;
        store.tables.lock().await.users.push(referrer);

        let referral = store
            .insert_referral(NewReferral::pending(
                referrer_id,
                "friend@example.com".to_string(),
                None,
            ))
            .await
            .unwrap();

        assert!(store.promote_if_pending(referral.id).await.unwrap());
        assert!(!store.promote_if_pending(referral.id).await.unwrap());

        let user = store.find_user(referrer_id).await.unwrap().unwrap();
        assert_eq!(user.referral_count, 1);
        assert!(user.last_referral_at.is_some());
    }

    #[tokio::test]
    async fn test_oldest_pending_wins() {
        let store = MemoryStore::new();
        let first = NewReferral::pending(Uuid::new_v4(), "dup@example.com".to_string(), None);
        let mut second = NewReferral::pending(Uuid::new_v4(), "dup@example.com".to_string(), None);
        second.created_at = first.created_at + chrono::Duration::seconds(5);
        let first_id = first.id;

        store.insert_referral(second).await.unwrap();
        store.insert_referral(first).await.unwrap();

        let oldest = store
            .find_oldest_pending_by_email("dup@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(oldest.id, first_id);
    }

    #[tokio::test]
    async fn test_delete_wave_detaches_users() {
        let store = MemoryStore::new();
        let wave = store
            .insert_wave(NewWave::inactive("w1".to_string(), None, 1, 10))
            .await
            .unwrap();
        let user = store
            .insert_user(NewWaitlistUser::at_position(
                "a@example.com".to_string(),
                "AAAA0000".to_string(),
                5,
            ))
            .await
            .unwrap();

        store.activate_wave(wave.id, Utc::now()).await.unwrap();
        let detached = store.delete_wave(wave.id).await.unwrap();
        assert_eq!(detached, 1);

        let user = store.find_user(user.id).await.unwrap().unwrap();
        assert!(user.wave_id.is_none());
        assert!(!user.access_granted);
        assert!(store.find_wave(wave.id).await.unwrap().is_none());
    }
}
