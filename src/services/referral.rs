// Referral Orchestrator
// Composes the throttle ledger, rate limiter, validator and record store.
// Every pre-condition is checked before the first write; notification and
// CRM sync run after the write and can only ever fail quietly.

use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::models::referral::{
    CreateReferralRequest, NewReferral, Referral, SignupValidation,
};
use crate::services::crm::CrmSync;
use crate::services::email::EmailService;
use crate::services::rate_limit::ReferralRateLimiter;
use crate::services::throttle::IpThrottleLedger;
use crate::store::{RecordStore, ReferralStore, StoreError, WaitlistStore};
use crate::utils::referral_validator::{validate_referral, ValidationOutcome};

#[derive(Debug, Error)]
pub enum ReferralError {
    #[error("Referral validation failed: {0:?}")]
    Validation(Vec<String>),

    #[error("Throttled: {reason}")]
    Throttled {
        reason: String,
        remaining_attempts: u32,
        remaining_verifications: u32,
    },

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("referral already exists")]
    Duplicate,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub struct ReferralService {
    store: Arc<dyn RecordStore>,
    throttle: Arc<IpThrottleLedger>,
    rate_limiter: Arc<ReferralRateLimiter>,
    email: Arc<EmailService>,
    crm: Arc<dyn CrmSync>,
}

impl ReferralService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        throttle: Arc<IpThrottleLedger>,
        rate_limiter: Arc<ReferralRateLimiter>,
        email: Arc<EmailService>,
        crm: Arc<dyn CrmSync>,
    ) -> Self {
        Self {
            store,
            throttle,
            rate_limiter,
            email,
            crm,
        }
    }

    /// Register a new referral as `pending`.
    ///
    /// Check order: fraud validation, IP throttle, submission rate limit,
    /// duplicate pair. The first failing check aborts before any write.
    #[instrument(skip(self, request), fields(referrer = %request.referrer_id))]
    pub async fn create_referral(
        &self,
        mut request: CreateReferralRequest,
    ) -> Result<Referral, ReferralError> {
        request.sanitize();

        // 1. Fraud checks, all reasons aggregated
        if let ValidationOutcome::Invalid(reasons) = validate_referral(&request) {
            return Err(ReferralError::Validation(reasons));
        }

        let referrer_id = Uuid::from_str(&request.referrer_id)
            .map_err(|_| ReferralError::Validation(vec!["invalid referrer id".to_string()]))?;

        // 2. IP throttle; the check is read-only, the attempt is recorded
        //    only once the IP is allowed through
        if let Some(ref ip) = request.user_ip {
            let decision = self.throttle.check(ip).await;
            if decision.throttled {
                return Err(ReferralError::Throttled {
                    reason: decision
                        .reason
                        .unwrap_or_else(|| "throttled".to_string()),
                    remaining_attempts: decision.remaining_attempts,
                    remaining_verifications: decision.remaining_verifications,
                });
            }
            self.throttle.record_attempt(ip, false).await;
        }

        // 3. Per-referrer submission window
        if !self.rate_limiter.can_submit(&request.referrer_id).await {
            return Err(ReferralError::RateLimited);
        }

        // 4. One row per (referrer, email) pair, cancelled ones included
        if self
            .store
            .find_referral_by_pair(referrer_id, &request.referred_email)
            .await?
            .is_some()
        {
            return Err(ReferralError::Duplicate);
        }

        // 5. Insert pending; a racing duplicate insert loses on the unique
        //    index and is reported the same way as step 4
        let new_referral = NewReferral::pending(
            referrer_id,
            request.referred_email.clone(),
            request.user_ip.clone(),
        );
        let referral = match self.store.insert_referral(new_referral).await {
            Ok(referral) => referral,
            Err(StoreError::Conflict(_)) => return Err(ReferralError::Duplicate),
            Err(e) => return Err(e.into()),
        };

        // 6. The submission only counts once it actually landed
        self.rate_limiter
            .record_submission(&request.referrer_id)
            .await;

        info!(
            "Referral {} created for referrer {}",
            referral.id, referral.referrer_id
        );

        self.spawn_post_create_effects(&referral).await;

        Ok(referral)
    }

    /// Opportunistic hook run on every auth state change.
    ///
    /// Never errors: store failures degrade to `matched: false` so the auth
    /// flow is never blocked by referral bookkeeping. The oldest pending
    /// referral for the email wins, by `created_at`.
    #[instrument(skip(self))]
    pub async fn validate_on_signup(
        &self,
        referred_email: &str,
        referred_user_id: Uuid,
        is_email_verified: bool,
    ) -> SignupValidation {
        let email = referred_email.trim().to_lowercase();

        // The lookup is an idempotent read, so one bounded retry is allowed
        // before degrading to a no-op; writes below are never retried.
        let lookup = match self.store.find_oldest_pending_by_email(&email).await {
            Err(first_error) => {
                warn!(
                    "Signup validation lookup failed for {}, retrying once: {}",
                    email, first_error
                );
                self.store.find_oldest_pending_by_email(&email).await
            },
            ok => ok,
        };

        let referral = match lookup {
            Ok(Some(referral)) => referral,
            Ok(None) => return SignupValidation::default(),
            Err(e) => {
                warn!("Signup validation lookup failed for {}: {}", email, e);
                return SignupValidation::default();
            },
        };

        // The referred account is linked even before its email is verified;
        // status stays pending until verification so a later call can still
        // promote this same referral.
        if let Err(e) = self
            .store
            .attach_referred_user(referral.id, referred_user_id)
            .await
        {
            warn!("Failed to attach user to referral {}: {}", referral.id, e);
            return SignupValidation::default();
        }

        let mut verified = false;
        if is_email_verified {
            match self.store.promote_if_pending(referral.id).await {
                Ok(true) => {
                    verified = true;
                    info!("Referral {} promoted to verified", referral.id);
                },
                Ok(false) => {
                    // Lost a concurrent promotion; the counter was already
                    // bumped exactly once by the winner.
                },
                Err(e) => {
                    warn!("Failed to promote referral {}: {}", referral.id, e);
                },
            }
        }

        let referrer = match self.store.find_user(referral.referrer_id).await {
            Ok(referrer) => referrer,
            Err(e) => {
                warn!("Referrer lookup failed for {}: {}", referral.referrer_id, e);
                None
            },
        };

        if verified {
            if let Some(ref referrer) = referrer {
                // The lookup ran after the promote, so referral_count already
                // includes this verification.
                self.spawn_post_verify_effects(
                    referrer.email.clone(),
                    email.clone(),
                    referrer.referral_count,
                )
                .await;
            }
        }

        SignupValidation {
            matched: true,
            verified,
            referral_id: Some(referral.id),
            referrer_id: Some(referral.referrer_id),
            referrer_code: referrer.map(|u| u.referral_code),
        }
    }

    /// Cancel a pending referral (admin fraud review). Terminal states are
    /// left untouched; returns whether the transition happened.
    #[instrument(skip(self))]
    pub async fn cancel_referral(&self, referral_id: Uuid) -> Result<bool, ReferralError> {
        let cancelled = self.store.cancel_if_pending(referral_id).await?;
        if cancelled {
            info!("Referral {} cancelled", referral_id);
        }
        Ok(cancelled)
    }

    /// Compose and send the waitlist digest to an admin address
    #[instrument(skip(self))]
    pub async fn send_admin_digest(
        &self,
        to_email: &str,
        period: &str,
    ) -> Result<(), ReferralError> {
        use crate::models::referral::ReferralStatus;

        let total_users = self.store.count_users().await?;
        let pending = self
            .store
            .count_referrals_by_status(ReferralStatus::Pending)
            .await?;
        let verified = self
            .store
            .count_referrals_by_status(ReferralStatus::Verified)
            .await?;

        if let Err(e) = self
            .email
            .send_admin_digest(to_email, period, total_users, pending, verified)
            .await
        {
            warn!("Admin digest delivery failed: {}", e);
        }
        Ok(())
    }

    /// Invite email to the referred friend + CRM contact upsert, both
    /// fire-and-forget
    async fn spawn_post_create_effects(&self, referral: &Referral) {
        let referrer_code = match self.store.find_user(referral.referrer_id).await {
            Ok(Some(referrer)) => Some(referrer.referral_code),
            Ok(None) => None,
            Err(e) => {
                warn!("Referrer lookup failed for invite email: {}", e);
                None
            },
        };

        let email_service = self.email.clone();
        let referred_email = referral.referred_email.clone();
        if let Some(code) = referrer_code {
            let invite_to = referred_email.clone();
            tokio::spawn(async move {
                if let Err(e) = email_service.send_referral_invite(&invite_to, &code).await {
                    warn!("Referral invite to {} failed: {}", invite_to, e);
                }
            });
        }

        let crm = self.crm.clone();
        let referrer_id = referral.referrer_id;
        tokio::spawn(async move {
            let attributes = serde_json::json!({
                "referral_status": "pending",
                "referred_by": referrer_id,
            });
            if let Err(e) = crm.upsert_contact(&referred_email, attributes).await {
                warn!("CRM upsert for {} failed: {}", referred_email, e);
            }
        });
    }

    /// Referrer congratulation email + CRM status flip, fire-and-forget
    async fn spawn_post_verify_effects(
        &self,
        referrer_email: String,
        referred_email: String,
        referral_count: i32,
    ) {
        let email_service = self.email.clone();
        let crm = self.crm.clone();
        let crm_email = referred_email.clone();

        tokio::spawn(async move {
            if let Err(e) = email_service
                .send_referral_verified(&referrer_email, &referred_email, referral_count)
                .await
            {
                warn!("Referral-verified email to {} failed: {}", referrer_email, e);
            }
        });

        tokio::spawn(async move {
            let attributes = serde_json::json!({ "referral_status": "verified" });
            if let Err(e) = crm.upsert_contact(&crm_email, attributes).await {
                warn!("CRM status update for {} failed: {}", crm_email, e);
            }
        });
    }
}
