// Waitlist signup service
// Member registration with rank assignment, referral-code issuance and
// opportunistic referral validation on auth events

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::models::referral::SignupValidation;
use crate::models::user::{JoinWaitlistRequest, NewWaitlistUser, WaitlistUser};
use crate::services::crm::CrmSync;
use crate::services::referral::ReferralService;
use crate::store::{RecordStore, StoreError, WaitlistStore};
use crate::utils::referral_code::{ReferralCodeError, ReferralCodeGenerator};

#[derive(Debug, Error)]
pub enum WaitlistError {
    #[error("Email already on the waitlist")]
    EmailTaken,

    #[error("Referral code generation failed: {0}")]
    CodeGeneration(#[from] ReferralCodeError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub struct WaitlistService {
    store: Arc<dyn RecordStore>,
    code_generator: ReferralCodeGenerator,
    referrals: Arc<ReferralService>,
    crm: Arc<dyn CrmSync>,
}

impl WaitlistService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        referrals: Arc<ReferralService>,
        crm: Arc<dyn CrmSync>,
    ) -> Self {
        let code_generator = ReferralCodeGenerator::new(store.clone());
        Self {
            store,
            code_generator,
            referrals,
            crm,
        }
    }

    /// Register a new waitlist member at the tail of the list.
    ///
    /// `referred_by` attribution is best-effort: an unknown code is logged
    /// and ignored rather than failing the signup.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn join(&self, mut request: JoinWaitlistRequest) -> Result<WaitlistUser, WaitlistError> {
        request.sanitize();

        if self
            .store
            .find_user_by_email(&request.email)
            .await?
            .is_some()
        {
            return Err(WaitlistError::EmailTaken);
        }

        if let Some(ref code) = request.referred_by {
            if self.store.find_user_by_referral_code(code).await?.is_none() {
                warn!("Unknown referral code {} on signup, ignoring", code);
            }
        }

        let referral_code = self.code_generator.generate().await?;
        let position = self.store.count_users().await? as i32 + 1;

        let user = match self
            .store
            .insert_user(NewWaitlistUser::at_position(
                request.email.clone(),
                referral_code,
                position,
            ))
            .await
        {
            Ok(user) => user,
            Err(StoreError::Conflict(_)) => return Err(WaitlistError::EmailTaken),
            Err(e) => return Err(e.into()),
        };

        info!("User {} joined the waitlist at position {}", user.id, position);

        // Marketing contact sync never blocks the signup.
        let crm = self.crm.clone();
        let contact_email = user.email.clone();
        let referred_by = request.referred_by.clone();
        tokio::spawn(async move {
            let attributes = serde_json::json!({
                "waitlist": true,
                "referred_by_code": referred_by,
            });
            if let Err(e) = crm.upsert_contact(&contact_email, attributes).await {
                warn!("CRM upsert for {} failed: {}", contact_email, e);
            }
        });

        Ok(user)
    }

    /// Auth-event hook: mark the member verified and run the referral
    /// signup validation. Referral bookkeeping failures never propagate.
    #[instrument(skip(self))]
    pub async fn handle_email_verified(
        &self,
        email: &str,
        user_id: Uuid,
    ) -> Result<SignupValidation, WaitlistError> {
        if let Err(e) = self.store.mark_email_verified(user_id).await {
            // The member row may live in the identity provider only; the
            // referral hook still runs.
            warn!("Could not flag {} as verified: {}", user_id, e);
        }

        Ok(self.referrals.validate_on_signup(email, user_id, true).await)
    }

    /// Leaderboard read model
    pub async fn leaderboard(&self, limit: i64) -> Result<Vec<WaitlistUser>, WaitlistError> {
        Ok(self.store.top_referrers(limit).await?)
    }
}
