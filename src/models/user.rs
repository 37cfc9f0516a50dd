// Waitlist User Database Model
// Rank, referral code and wave-derived access flag for a signed-up user

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::schema::waitlist_users;

/// Waitlist member as stored in the database
///
/// `access_granted` is derived state: true only while the wave covering
/// `waitlist_position` is active. `referral_count` is bumped exactly once per
/// verified referral by the store's conditional promote.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = waitlist_users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WaitlistUser {
    pub id: Uuid,
    pub email: String,
    pub referral_code: String,
    pub waitlist_position: i32,
    pub wave_id: Option<Uuid>,
    pub access_granted: bool,
    pub email_verified: bool,
    pub referral_count: i32,
    pub last_referral_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New waitlist member for insertion
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = waitlist_users)]
pub struct NewWaitlistUser {
    pub id: Uuid,
    pub email: String,
    pub referral_code: String,
    pub waitlist_position: i32,
    pub wave_id: Option<Uuid>,
    pub access_granted: bool,
    pub email_verified: bool,
    pub referral_count: i32,
    pub last_referral_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewWaitlistUser {
    pub fn at_position(email: String, referral_code: String, waitlist_position: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            referral_code,
            waitlist_position,
            wave_id: None,
            access_granted: false,
            email_verified: false,
            referral_count: 0,
            last_referral_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request to join the waitlist
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct JoinWaitlistRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,

    /// Referral code of the member who invited this signup, if any
    #[validate(length(max = 12, message = "Referral code must be at most 12 characters"))]
    pub referred_by: Option<String>,
}

impl JoinWaitlistRequest {
    pub fn sanitize(&mut self) {
        self.email = self.email.trim().to_lowercase();
        self.referred_by = self
            .referred_by
            .as_ref()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty());
    }
}

/// One row of the referral leaderboard
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub referral_code: String,
    pub referral_count: i32,
    pub waitlist_position: i32,
}

impl LeaderboardEntry {
    pub fn from_users(users: Vec<WaitlistUser>) -> Vec<Self> {
        users
            .into_iter()
            .enumerate()
            .map(|(i, user)| Self {
                rank: i + 1,
                referral_code: user.referral_code,
                referral_count: user.referral_count,
                waitlist_position: user.waitlist_position,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_defaults() {
        let user =
            NewWaitlistUser::at_position("a@example.com".to_string(), "AB12CD34".to_string(), 7);
        assert_eq!(user.waitlist_position, 7);
        assert!(!user.access_granted);
        assert!(!user.email_verified);
        assert_eq!(user.referral_count, 0);
        assert!(user.wave_id.is_none());
    }

    #[test]
    fn test_join_request_sanitize() {
        let mut request = JoinWaitlistRequest {
            email: " New@Example.COM ".to_string(),
            referred_by: Some(" ab12cd34 ".to_string()),
        };
        request.sanitize();
        assert_eq!(request.email, "new@example.com");
        assert_eq!(request.referred_by.as_deref(), Some("AB12CD34"));

        let mut empty = JoinWaitlistRequest {
            email: "a@b.co".to_string(),
            referred_by: Some("   ".to_string()),
        };
        empty.sanitize();
        assert!(empty.referred_by.is_none());
    }

    #[test]
    fn test_leaderboard_ranks_in_order() {
        let mut first =
            NewWaitlistUser::at_position("a@example.com".to_string(), "AAAA1111".to_string(), 1);
        first.referral_count = 9;
        let second =
            NewWaitlistUser::at_position("b@example.com".to_string(), "BBBB2222".to_string(), 2);

        let users = vec![first, second]
            .into_iter()
            .map(|new| WaitlistUser {
                id: new.id,
                email: new.email,
                referral_code: new.referral_code,
                waitlist_position: new.waitlist_position,
                wave_id: new.wave_id,
                access_granted: new.access_granted,
                email_verified: new.email_verified,
                referral_count: new.referral_count,
                last_referral_at: new.last_referral_at,
                created_at: new.created_at,
                updated_at: new.updated_at,
            })
            .collect();

        let board = LeaderboardEntry::from_users(users);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].referral_count, 9);
        assert_eq!(board[1].rank, 2);
    }
}
