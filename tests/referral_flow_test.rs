// End-to-end referral lifecycle against the in-memory store:
// creation pre-conditions, duplicate rejection, signup validation and the
// at-most-once promotion guarantee

mod common;

use common::{harness, seed_user};
use uuid::Uuid;
use waitlist_core::models::referral::CreateReferralRequest;
use waitlist_core::services::ReferralError;
use waitlist_core::store::{ReferralStore, WaitlistStore};

fn request(referrer_id: &str, email: &str) -> CreateReferralRequest {
    CreateReferralRequest {
        referrer_id: referrer_id.to_string(),
        referred_email: email.to_string(),
        user_ip: None,
        user_agent: None,
    }
}

#[tokio::test]
async fn test_referral_lifecycle_to_verified() {
    let h = harness();
    let referrer = seed_user(&h.store, "owner@example.com", "OWNER234", 1).await;

    let referral = h
        .referrals
        .create_referral(request(
            &referrer.id.to_string(),
            "friend@example.com",
        ))
        .await
        .expect("create referral");

    assert_eq!(referral.status, "pending");
    assert_eq!(referral.referred_email, "friend@example.com");
    assert!(referral.referred_user_id.is_none());

    let referred_user_id = Uuid::new_v4();
    let outcome = h
        .referrals
        .validate_on_signup("friend@example.com", referred_user_id, true)
        .await;

    assert!(outcome.matched);
    assert!(outcome.verified);
    assert_eq!(outcome.referrer_id, Some(referrer.id));
    assert_eq!(outcome.referrer_code.as_deref(), Some("OWNER234"));

    let stored = h
        .store
        .find_referral_by_pair(referrer.id, "friend@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, "verified");
    assert_eq!(stored.referred_user_id, Some(referred_user_id));

    let referrer = h.store.find_user(referrer.id).await.unwrap().unwrap();
    assert_eq!(referrer.referral_count, 1);
    assert!(referrer.last_referral_at.is_some());
}

#[tokio::test]
async fn test_duplicate_pair_rejected_with_one_row_stored() {
    let h = harness();
    let referrer = seed_user(&h.store, "owner@example.com", "OWNER234", 1).await;
    let referrer_id = referrer.id.to_string();

    h.referrals
        .create_referral(request(&referrer_id, "friend@example.com"))
        .await
        .expect("first create");

    let second = h
        .referrals
        .create_referral(request(&referrer_id, "friend@example.com"))
        .await;
    assert!(matches!(second, Err(ReferralError::Duplicate)));

    // Case-folding cannot sneak a second row in
    let shouting = h
        .referrals
        .create_referral(request(&referrer_id, "FRIEND@EXAMPLE.COM"))
        .await;
    assert!(matches!(shouting, Err(ReferralError::Duplicate)));

    assert_eq!(
        h.store.count_referrals_for(referrer.id).await.unwrap(),
        1,
        "exactly one referral row may exist for the pair"
    );
}

#[tokio::test]
async fn test_validation_reasons_are_aggregated() {
    let h = harness();
    let referrer = seed_user(&h.store, "owner@example.com", "OWNER234", 1).await;

    let mut bad = request(&referrer.id.to_string(), "test@fake");
    bad.user_agent = Some("somebot/1.0".to_string());

    let result = h.referrals.create_referral(bad).await;
    let Err(ReferralError::Validation(reasons)) = result else {
        panic!("expected validation failure, got {:?}", result);
    };

    assert!(reasons.contains(&"invalid email format".to_string()));
    assert!(reasons.contains(&"suspicious email pattern detected".to_string()));
    assert!(reasons.contains(&"bot user agent detected".to_string()));
}

#[tokio::test]
async fn test_signup_without_pending_referral_is_a_noop() {
    let h = harness();

    let outcome = h
        .referrals
        .validate_on_signup("stranger@example.com", Uuid::new_v4(), true)
        .await;

    assert!(!outcome.matched);
    assert!(!outcome.verified);
    assert!(outcome.referral_id.is_none());
}

#[tokio::test]
async fn test_unverified_signup_keeps_referral_pending() {
    let h = harness();
    let referrer = seed_user(&h.store, "owner@example.com", "OWNER234", 1).await;

    let referral = h
        .referrals
        .create_referral(request(&referrer.id.to_string(), "friend@example.com"))
        .await
        .unwrap();

    let referred_user_id = Uuid::new_v4();
    let first = h
        .referrals
        .validate_on_signup("friend@example.com", referred_user_id, false)
        .await;
    assert!(first.matched);
    assert!(!first.verified);

    let stored = h
        .store
        .find_referral_by_pair(referrer.id, "friend@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, "pending", "unverified email must not promote");
    assert_eq!(stored.referred_user_id, Some(referred_user_id));

    // The same referral is matched again once verification completes
    let second = h
        .referrals
        .validate_on_signup("friend@example.com", referred_user_id, true)
        .await;
    assert!(second.verified);
    assert_eq!(second.referral_id, Some(referral.id));
}

#[tokio::test]
async fn test_terminal_states_never_move() {
    let h = harness();
    let referrer = seed_user(&h.store, "owner@example.com", "OWNER234", 1).await;

    let referral = h
        .referrals
        .create_referral(request(&referrer.id.to_string(), "friend@example.com"))
        .await
        .unwrap();

    // pending -> cancelled is terminal
    assert!(h.referrals.cancel_referral(referral.id).await.unwrap());
    assert!(!h.referrals.cancel_referral(referral.id).await.unwrap());

    let outcome = h
        .referrals
        .validate_on_signup("friend@example.com", Uuid::new_v4(), true)
        .await;
    assert!(
        !outcome.matched,
        "cancelled referral must not be matched by signup validation"
    );

    let stored = h
        .store
        .find_referral_by_pair(referrer.id, "friend@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, "cancelled");

    // verified is terminal too: promote then try to cancel
    let other = h
        .referrals
        .create_referral(request(&referrer.id.to_string(), "other@example.com"))
        .await
        .unwrap();
    h.referrals
        .validate_on_signup("other@example.com", Uuid::new_v4(), true)
        .await;
    assert!(!h.referrals.cancel_referral(other.id).await.unwrap());

    let stored = h
        .store
        .find_referral_by_pair(referrer.id, "other@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, "verified");
}

#[tokio::test]
async fn test_concurrent_verification_counts_once() {
    let h = harness();
    let referrer = seed_user(&h.store, "owner@example.com", "OWNER234", 1).await;

    h.referrals
        .create_referral(request(&referrer.id.to_string(), "friend@example.com"))
        .await
        .unwrap();

    let referred_user_id = Uuid::new_v4();
    let service_a = h.referrals.clone();
    let service_b = h.referrals.clone();

    let (a, b) = tokio::join!(
        tokio::spawn(async move {
            service_a
                .validate_on_signup("friend@example.com", referred_user_id, true)
                .await
        }),
        tokio::spawn(async move {
            service_b
                .validate_on_signup("friend@example.com", referred_user_id, true)
            .await
        }),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    let verified_count = [&a, &b].iter().filter(|o| o.verified).count();
    assert_eq!(verified_count, 1, "exactly one caller wins the promotion");

    let referrer = h.store.find_user(referrer.id).await.unwrap().unwrap();
    assert_eq!(
        referrer.referral_count, 1,
        "counter must be bumped exactly once"
    );

    let stored = h
        .store
        .find_oldest_pending_by_email("friend@example.com")
        .await
        .unwrap();
    assert!(stored.is_none(), "no pending referral may remain");
}

#[tokio::test]
async fn test_oldest_pending_referral_wins_on_signup() {
    let h = harness();
    let first_referrer = seed_user(&h.store, "first@example.com", "FIRST234", 1).await;
    let second_referrer = seed_user(&h.store, "second@example.com", "SECOND34", 2).await;

    // Two different referrers invited the same address; insertion order is
    // creation order, so the first referrer's row is older.
    h.referrals
        .create_referral(request(&first_referrer.id.to_string(), "friend@example.com"))
        .await
        .unwrap();
    h.referrals
        .create_referral(request(
            &second_referrer.id.to_string(),
            "friend@example.com",
        ))
        .await
        .unwrap();

    let outcome = h
        .referrals
        .validate_on_signup("friend@example.com", Uuid::new_v4(), true)
        .await;

    assert_eq!(outcome.referrer_id, Some(first_referrer.id));

    let first = h.store.find_user(first_referrer.id).await.unwrap().unwrap();
    let second = h.store.find_user(second_referrer.id).await.unwrap().unwrap();
    assert_eq!(first.referral_count, 1);
    assert_eq!(second.referral_count, 0);
}
