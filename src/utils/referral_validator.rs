// Referral payload fraud checks
// Four independent checks; every failing reason is collected, not just the first

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::referral::CreateReferralRequest;

lazy_static! {
    // Shape check only: local@domain.tld. Deliverability is not our problem.
    static ref EMAIL_SHAPE_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

const SELF_REFERRAL_REASON: &str = "self-referral detected";
const INVALID_EMAIL_REASON: &str = "invalid email format";
const SUSPICIOUS_EMAIL_REASON: &str = "suspicious email pattern detected";
const BOT_AGENT_REASON: &str = "bot user agent detected";

const SUSPICIOUS_EMAIL_PATTERNS: &[&str] = &["test", "temp", "fake"];
const BOT_AGENT_PATTERNS: &[&str] = &["bot", "crawler", "spider"];

/// Tagged validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(Vec<String>),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    pub fn into_reasons(self) -> Vec<String> {
        match self {
            ValidationOutcome::Valid => Vec::new(),
            ValidationOutcome::Invalid(reasons) => reasons,
        }
    }
}

/// Run all four fraud checks over a referral payload.
///
/// The self-referral check compares the raw referrer id against the email as
/// strings. With UUID referrer ids the two essentially never collide, so it
/// only catches callers echoing the email into the id field. Kept verbatim
/// for parity with the production behavior this service replaced.
pub fn validate_referral(payload: &CreateReferralRequest) -> ValidationOutcome {
    let mut reasons = Vec::new();

    if is_self_referral(&payload.referrer_id, &payload.referred_email) {
        reasons.push(SELF_REFERRAL_REASON.to_string());
    }
    if !has_valid_email_shape(&payload.referred_email) {
        reasons.push(INVALID_EMAIL_REASON.to_string());
    }
    if has_suspicious_email_pattern(&payload.referred_email) {
        reasons.push(SUSPICIOUS_EMAIL_REASON.to_string());
    }
    if let Some(ref user_agent) = payload.user_agent {
        if is_bot_user_agent(user_agent) {
            reasons.push(BOT_AGENT_REASON.to_string());
        }
    }

    if reasons.is_empty() {
        ValidationOutcome::Valid
    } else {
        ValidationOutcome::Invalid(reasons)
    }
}

fn is_self_referral(referrer_id: &str, referred_email: &str) -> bool {
    referrer_id == referred_email
}

fn has_valid_email_shape(email: &str) -> bool {
    EMAIL_SHAPE_REGEX.is_match(email)
}

fn has_suspicious_email_pattern(email: &str) -> bool {
    let email = email.to_lowercase();
    SUSPICIOUS_EMAIL_PATTERNS
        .iter()
        .any(|pattern| email.contains(pattern))
}

fn is_bot_user_agent(user_agent: &str) -> bool {
    let user_agent = user_agent.to_lowercase();
    BOT_AGENT_PATTERNS
        .iter()
        .any(|pattern| user_agent.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(referrer_id: &str, email: &str, user_agent: Option<&str>) -> CreateReferralRequest {
        CreateReferralRequest {
            referrer_id: referrer_id.to_string(),
            referred_email: email.to_string(),
            user_ip: None,
            user_agent: user_agent.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_clean_payload_is_valid() {
        let outcome = validate_referral(&payload(
            "8c3f9a2e-1111-2222-3333-444455556666",
            "friend@example.com",
            Some("Mozilla/5.0"),
        ));
        assert!(outcome.is_valid());
        assert!(outcome.into_reasons().is_empty());
    }

    #[test]
    fn test_self_referral_string_match() {
        let outcome = validate_referral(&payload("me@example.com", "me@example.com", None));
        assert_eq!(
            outcome,
            ValidationOutcome::Invalid(vec![SELF_REFERRAL_REASON.to_string()])
        );
    }

    #[test]
    fn test_malformed_email_rejected() {
        for email in ["plainaddress", "missing@tld", "@nodomain.com", "a b@c.io"] {
            let outcome = validate_referral(&payload("u1", email, None));
            assert!(
                outcome
                    .clone()
                    .into_reasons()
                    .contains(&INVALID_EMAIL_REASON.to_string()),
                "{} should be rejected, got {:?}",
                email,
                outcome
            );
        }
    }

    #[test]
    fn test_suspicious_patterns_case_insensitive() {
        for email in [
            "TEST@example.com",
            "my.temp@example.com",
            "Fake.Friend@example.com",
        ] {
            let reasons = validate_referral(&payload("u1", email, None)).into_reasons();
            assert!(
                reasons.contains(&SUSPICIOUS_EMAIL_REASON.to_string()),
                "{} should be flagged",
                email
            );
        }
    }

    #[test]
    fn test_bot_user_agents_flagged() {
        for agent in ["somebot/1.0", "WebCrawler 2.0", "my-Spider"] {
            let reasons =
                validate_referral(&payload("u1", "friend@example.com", Some(agent))).into_reasons();
            assert_eq!(reasons, vec![BOT_AGENT_REASON.to_string()], "{}", agent);
        }
    }

    #[test]
    fn test_missing_user_agent_is_not_a_bot() {
        assert!(validate_referral(&payload("u1", "friend@example.com", None)).is_valid());
    }

    #[test]
    fn test_all_reasons_accumulate() {
        // "test@fake" trips the shape check (no TLD), the suspicious-pattern
        // check (twice over) and arrives with a bot agent.
        let reasons =
            validate_referral(&payload("u1", "test@fake", Some("somebot/1.0"))).into_reasons();

        assert_eq!(
            reasons,
            vec![
                INVALID_EMAIL_REASON.to_string(),
                SUSPICIOUS_EMAIL_REASON.to_string(),
                BOT_AGENT_REASON.to_string(),
            ]
        );
    }
}
