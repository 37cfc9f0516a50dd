// PostgreSQL record store backed by the diesel-async pool

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::DieselPool;
use crate::models::referral::{NewReferral, Referral, ReferralStatus};
use crate::models::user::{NewWaitlistUser, WaitlistUser};
use crate::models::wave::{NewWave, Wave, WaveChanges};
use crate::store::{ReferralStore, StoreError, WaitlistStore, WaveStore};

#[derive(Clone)]
pub struct PgStore {
    pool: DieselPool,
}

impl PgStore {
    pub fn new(pool: DieselPool) -> Self {
        Self { pool }
    }

    async fn conn(
        &self,
    ) -> Result<bb8::PooledConnection<'_, diesel_async::pooled_connection::AsyncDieselConnectionManager<diesel_async::AsyncPgConnection>>, StoreError>
    {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))
    }
}

#[async_trait]
impl ReferralStore for PgStore {
    async fn insert_referral(&self, new_referral: NewReferral) -> Result<Referral, StoreError> {
        use crate::schema::referrals::dsl;

        let mut conn = self.conn().await?;
        let referral = diesel::insert_into(dsl::referrals)
            .values(&new_referral)
            .get_result::<Referral>(&mut conn)
            .await?;
        Ok(referral)
    }

    async fn find_referral_by_pair(
        &self,
        referrer_id: Uuid,
        referred_email: &str,
    ) -> Result<Option<Referral>, StoreError> {
        use crate::schema::referrals::dsl;

        let mut conn = self.conn().await?;
        let referral = dsl::referrals
            .filter(dsl::referrer_id.eq(referrer_id))
            .filter(dsl::referred_email.eq(referred_email))
            .select(Referral::as_select())
            .first::<Referral>(&mut conn)
            .await
            .optional()?;
        Ok(referral)
    }

    async fn find_oldest_pending_by_email(
        &self,
        referred_email: &str,
    ) -> Result<Option<Referral>, StoreError> {
        use crate::schema::referrals::dsl;

        let mut conn = self.conn().await?;
        let referral = dsl::referrals
            .filter(dsl::status.eq(ReferralStatus::Pending.as_str()))
            .filter(dsl::referred_email.eq(referred_email))
            .order(dsl::created_at.asc())
            .select(Referral::as_select())
            .first::<Referral>(&mut conn)
            .await
            .optional()?;
        Ok(referral)
    }

    async fn attach_referred_user(
        &self,
        referral_id: Uuid,
        referred_user_id: Uuid,
    ) -> Result<(), StoreError> {
        use crate::schema::referrals::dsl;

        let mut conn = self.conn().await?;
        let updated = diesel::update(dsl::referrals.find(referral_id))
            .set((
                dsl::referred_user_id.eq(Some(referred_user_id)),
                dsl::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await?;

        if updated == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn promote_if_pending(&self, referral_id: Uuid) -> Result<bool, StoreError> {
        use crate::schema::{referrals, waitlist_users};

        let mut conn = self.conn().await?;
        let now = Utc::now();

        // The status flip and the counter bump must land together: the
        // guarded UPDATE is the compare-and-swap, and losing the race means
        // zero rows come back, so the counter is never double-bumped.
        let promoted = conn
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                Box::pin(async move {
                    let referrer: Option<Uuid> = diesel::update(
                        referrals::table
                            .filter(referrals::id.eq(referral_id))
                            .filter(referrals::status.eq(ReferralStatus::Pending.as_str())),
                    )
                    .set((
                        referrals::status.eq(ReferralStatus::Verified.as_str()),
                        referrals::updated_at.eq(now),
                    ))
                    .returning(referrals::referrer_id)
                    .get_result::<Uuid>(conn)
                    .await
                    .optional()?;

                    let Some(referrer_id) = referrer else {
                        return Ok(false);
                    };

                    diesel::update(waitlist_users::table.find(referrer_id))
                        .set((
                            waitlist_users::referral_count
                                .eq(waitlist_users::referral_count + 1),
                            waitlist_users::last_referral_at.eq(Some(now)),
                            waitlist_users::updated_at.eq(now),
                        ))
                        .execute(conn)
                        .await?;

                    Ok(true)
                })
            })
            .await?;

        Ok(promoted)
    }

    async fn cancel_if_pending(&self, referral_id: Uuid) -> Result<bool, StoreError> {
        use crate::schema::referrals::dsl;

        let mut conn = self.conn().await?;
        let updated = diesel::update(
            dsl::referrals
                .filter(dsl::id.eq(referral_id))
                .filter(dsl::status.eq(ReferralStatus::Pending.as_str())),
        )
        .set((
            dsl::status.eq(ReferralStatus::Cancelled.as_str()),
            dsl::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)
        .await?;

        Ok(updated == 1)
    }

    async fn count_referrals_for(&self, referrer_id: Uuid) -> Result<i64, StoreError> {
        use crate::schema::referrals::dsl;

        let mut conn = self.conn().await?;
        let count = dsl::referrals
            .filter(dsl::referrer_id.eq(referrer_id))
            .count()
            .get_result::<i64>(&mut conn)
            .await?;
        Ok(count)
    }

    async fn count_referrals_by_status(
        &self,
        status: ReferralStatus,
    ) -> Result<i64, StoreError> {
        use crate::schema::referrals::dsl;

        let mut conn = self.conn().await?;
        let count = dsl::referrals
            .filter(dsl::status.eq(status.as_str()))
            .count()
            .get_result::<i64>(&mut conn)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl WaveStore for PgStore {
    async fn insert_wave(&self, new_wave: NewWave) -> Result<Wave, StoreError> {
        use crate::schema::waves::dsl;

        let mut conn = self.conn().await?;
        let wave = diesel::insert_into(dsl::waves)
            .values(&new_wave)
            .get_result::<Wave>(&mut conn)
            .await?;
        Ok(wave)
    }

    async fn find_wave(&self, wave_id: Uuid) -> Result<Option<Wave>, StoreError> {
        use crate::schema::waves::dsl;

        let mut conn = self.conn().await?;
        let wave = dsl::waves
            .find(wave_id)
            .select(Wave::as_select())
            .first::<Wave>(&mut conn)
            .await
            .optional()?;
        Ok(wave)
    }

    async fn list_waves(&self) -> Result<Vec<Wave>, StoreError> {
        use crate::schema::waves::dsl;

        let mut conn = self.conn().await?;
        let waves = dsl::waves
            .order(dsl::start_position.asc())
            .select(Wave::as_select())
            .load::<Wave>(&mut conn)
            .await?;
        Ok(waves)
    }

    async fn update_wave(&self, wave_id: Uuid, changes: WaveChanges) -> Result<Wave, StoreError> {
        use crate::schema::waves::dsl;

        let mut conn = self.conn().await?;
        let wave = diesel::update(dsl::waves.find(wave_id))
            .set(&changes)
            .get_result::<Wave>(&mut conn)
            .await?;
        Ok(wave)
    }

    async fn activate_wave(&self, wave_id: Uuid, at: DateTime<Utc>) -> Result<u64, StoreError> {
        use crate::schema::{waitlist_users, waves};

        let mut conn = self.conn().await?;
        let granted = conn
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                Box::pin(async move {
                    let wave: Wave = diesel::update(waves::table.find(wave_id))
                        .set((
                            waves::is_active.eq(true),
                            waves::activated_at.eq(Some(at)),
                            waves::updated_at.eq(at),
                        ))
                        .get_result::<Wave>(conn)
                        .await?;

                    let granted = diesel::update(
                        waitlist_users::table
                            .filter(waitlist_users::waitlist_position.ge(wave.start_position))
                            .filter(waitlist_users::waitlist_position.le(wave.end_position)),
                    )
                    .set((
                        waitlist_users::wave_id.eq(Some(wave.id)),
                        waitlist_users::access_granted.eq(true),
                        waitlist_users::updated_at.eq(at),
                    ))
                    .execute(conn)
                    .await?;

                    Ok(granted as u64)
                })
            })
            .await?;

        Ok(granted)
    }

    async fn deactivate_wave(&self, wave_id: Uuid) -> Result<u64, StoreError> {
        use crate::schema::{waitlist_users, waves};

        let mut conn = self.conn().await?;
        let now = Utc::now();
        let revoked = conn
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                Box::pin(async move {
                    diesel::update(waves::table.find(wave_id))
                        .set((
                            waves::is_active.eq(false),
                            waves::activated_at.eq(None::<DateTime<Utc>>),
                            waves::updated_at.eq(now),
                        ))
                        .get_result::<Wave>(conn)
                        .await?;

                    let revoked = diesel::update(
                        waitlist_users::table
                            .filter(waitlist_users::wave_id.eq(Some(wave_id)))
                            .filter(waitlist_users::access_granted.eq(true)),
                    )
                    .set((
                        waitlist_users::access_granted.eq(false),
                        waitlist_users::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .await?;

                    Ok(revoked as u64)
                })
            })
            .await?;

        Ok(revoked)
    }

    async fn delete_wave(&self, wave_id: Uuid) -> Result<u64, StoreError> {
        use crate::schema::{waitlist_users, waves};

        let mut conn = self.conn().await?;
        let now = Utc::now();
        let detached = conn
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                Box::pin(async move {
                    // Detach first; the wave row only goes away once no user
                    // references it, and a failed detach rolls everything back.
                    let detached = diesel::update(
                        waitlist_users::table.filter(waitlist_users::wave_id.eq(Some(wave_id))),
                    )
                    .set((
                        waitlist_users::wave_id.eq(None::<Uuid>),
                        waitlist_users::access_granted.eq(false),
                        waitlist_users::updated_at.eq(now),
                    ))
                    .execute(conn)
                    .await?;

                    let deleted = diesel::delete(waves::table.find(wave_id))
                        .execute(conn)
                        .await?;
                    if deleted == 0 {
                        return Err(diesel::result::Error::NotFound);
                    }

                    Ok(detached as u64)
                })
            })
            .await?;

        Ok(detached)
    }

    async fn assign_wave_membership(&self, waves: &[Wave]) -> Result<u64, StoreError> {
        use crate::schema::waitlist_users;

        let mut conn = self.conn().await?;
        let now = Utc::now();
        let waves = waves.to_vec();

        let changed = conn
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                Box::pin(async move {
                    let users = waitlist_users::table
                        .select(WaitlistUser::as_select())
                        .load::<WaitlistUser>(conn)
                        .await?;

                    let mut changed = 0u64;
                    for user in users {
                        let target = waves
                            .iter()
                            .find(|wave| wave.covers(user.waitlist_position));
                        let (wave_id, access) = match target {
                            Some(wave) => (Some(wave.id), wave.is_active),
                            None => (None, false),
                        };

                        if user.wave_id == wave_id && user.access_granted == access {
                            continue;
                        }

                        diesel::update(waitlist_users::table.find(user.id))
                            .set((
                                waitlist_users::wave_id.eq(wave_id),
                                waitlist_users::access_granted.eq(access),
                                waitlist_users::updated_at.eq(now),
                            ))
                            .execute(conn)
                            .await?;
                        changed += 1;
                    }

                    Ok(changed)
                })
            })
            .await?;

        Ok(changed)
    }
}

#[async_trait]
impl WaitlistStore for PgStore {
    async fn insert_user(&self, new_user: NewWaitlistUser) -> Result<WaitlistUser, StoreError> {
        use crate::schema::waitlist_users::dsl;

        let mut conn = self.conn().await?;
        let user = diesel::insert_into(dsl::waitlist_users)
            .values(&new_user)
            .get_result::<WaitlistUser>(&mut conn)
            .await?;
        Ok(user)
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<WaitlistUser>, StoreError> {
        use crate::schema::waitlist_users::dsl;

        let mut conn = self.conn().await?;
        let user = dsl::waitlist_users
            .find(user_id)
            .select(WaitlistUser::as_select())
            .first::<WaitlistUser>(&mut conn)
            .await
            .optional()?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<WaitlistUser>, StoreError> {
        use crate::schema::waitlist_users::dsl;

        let mut conn = self.conn().await?;
        let user = dsl::waitlist_users
            .filter(dsl::email.eq(email))
            .select(WaitlistUser::as_select())
            .first::<WaitlistUser>(&mut conn)
            .await
            .optional()?;
        Ok(user)
    }

    async fn find_user_by_referral_code(
        &self,
        referral_code: &str,
    ) -> Result<Option<WaitlistUser>, StoreError> {
        use crate::schema::waitlist_users::dsl;

        let mut conn = self.conn().await?;
        let user = dsl::waitlist_users
            .filter(dsl::referral_code.eq(referral_code))
            .select(WaitlistUser::as_select())
            .first::<WaitlistUser>(&mut conn)
            .await
            .optional()?;
        Ok(user)
    }

    async fn referral_code_exists(&self, referral_code: &str) -> Result<bool, StoreError> {
        Ok(self.find_user_by_referral_code(referral_code).await?.is_some())
    }

    async fn count_users(&self) -> Result<i64, StoreError> {
        use crate::schema::waitlist_users::dsl;

        let mut conn = self.conn().await?;
        let count = dsl::waitlist_users
            .count()
            .get_result::<i64>(&mut conn)
            .await?;
        Ok(count)
    }

    async fn mark_email_verified(&self, user_id: Uuid) -> Result<(), StoreError> {
        use crate::schema::waitlist_users::dsl;

        let mut conn = self.conn().await?;
        let updated = diesel::update(dsl::waitlist_users.find(user_id))
            .set((
                dsl::email_verified.eq(true),
                dsl::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await?;

        if updated == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn top_referrers(&self, limit: i64) -> Result<Vec<WaitlistUser>, StoreError> {
        use crate::schema::waitlist_users::dsl;

        let mut conn = self.conn().await?;
        let users = dsl::waitlist_users
            .order((dsl::referral_count.desc(), dsl::created_at.asc()))
            .limit(limit)
            .select(WaitlistUser::as_select())
            .load::<WaitlistUser>(&mut conn)
            .await?;
        Ok(users)
    }
}
