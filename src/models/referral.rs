// Referral database model and API DTOs
// Three-state lifecycle: pending -> verified | cancelled (both terminal)

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::schema::referrals;

/// Referral lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReferralStatus {
    Pending,
    Verified,
    Cancelled,
}

impl ReferralStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralStatus::Pending => "pending",
            ReferralStatus::Verified => "verified",
            ReferralStatus::Cancelled => "cancelled",
        }
    }

    /// Verified and cancelled are terminal; no transition leaves them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReferralStatus::Pending)
    }
}

impl FromStr for ReferralStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReferralStatus::Pending),
            "verified" => Ok(ReferralStatus::Verified),
            "cancelled" => Ok(ReferralStatus::Cancelled),
            _ => Err(format!("Invalid referral status: {}", s)),
        }
    }
}

/// Referral record as stored in the database
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = referrals)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Referral {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub referred_email: String,
    pub referred_user_id: Option<Uuid>,
    pub referred_ip: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Referral {
    pub fn status(&self) -> ReferralStatus {
        // Rows only ever hold the three lifecycle strings; anything else is
        // treated as terminal so it can never be re-verified.
        ReferralStatus::from_str(&self.status).unwrap_or(ReferralStatus::Cancelled)
    }

    pub fn is_pending(&self) -> bool {
        self.status() == ReferralStatus::Pending
    }
}

/// New referral for insertion, always created pending
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = referrals)]
pub struct NewReferral {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub referred_email: String,
    pub referred_user_id: Option<Uuid>,
    pub referred_ip: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewReferral {
    pub fn pending(referrer_id: Uuid, referred_email: String, referred_ip: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            referrer_id,
            referred_email,
            referred_user_id: None,
            referred_ip,
            status: ReferralStatus::Pending.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request to register a referral
///
/// `referrer_id` stays a string here: the fraud checks compare it verbatim
/// against the submitted email before it is parsed into a UUID.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReferralRequest {
    #[validate(length(min = 1, max = 64, message = "Referrer id must be 1-64 characters"))]
    pub referrer_id: String,

    #[validate(length(min = 3, max = 320, message = "Email must be 3-320 characters"))]
    pub referred_email: String,

    pub user_ip: Option<String>,

    pub user_agent: Option<String>,
}

impl CreateReferralRequest {
    /// Trim inputs and lower-case the email (emails are stored normalized)
    pub fn sanitize(&mut self) {
        self.referrer_id = self.referrer_id.trim().to_string();
        self.referred_email = self.referred_email.trim().to_lowercase();
        self.user_ip = self.user_ip.as_ref().map(|s| s.trim().to_string());
        self.user_agent = self.user_agent.as_ref().map(|s| s.trim().to_string());
    }
}

/// Referral as returned to API consumers
#[derive(Debug, Clone, Serialize)]
pub struct ReferralResponse {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub referred_email: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Referral> for ReferralResponse {
    fn from(referral: Referral) -> Self {
        Self {
            id: referral.id,
            referrer_id: referral.referrer_id,
            referred_email: referral.referred_email,
            status: referral.status,
            created_at: referral.created_at,
        }
    }
}

/// Outcome of the opportunistic signup validation hook
///
/// `matched == false` covers both "no pending referral for this email" and
/// degraded store failures; the hook never raises.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SignupValidation {
    pub matched: bool,
    pub verified: bool,
    pub referral_id: Option<Uuid>,
    pub referrer_id: Option<Uuid>,
    pub referrer_code: Option<String>,
}
