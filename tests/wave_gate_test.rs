// Wave gate lifecycle: activation access grants, idempotent membership
// assignment, active-wave immutability and detach-before-delete

mod common;

use common::{harness, seed_user};
use uuid::Uuid;
use waitlist_core::models::wave::{CreateWaveRequest, UpdateWaveRequest};
use waitlist_core::services::WaveError;
use waitlist_core::store::WaitlistStore;

fn wave_request(name: &str, start: i32, end: i32) -> CreateWaveRequest {
    CreateWaveRequest {
        name: name.to_string(),
        description: None,
        start_position: start,
        end_position: end,
    }
}

#[tokio::test]
async fn test_activation_grants_access_in_range() {
    let h = harness();
    let in_range = seed_user(&h.store, "fifty@example.com", "FIFTY234", 50).await;
    let out_of_range = seed_user(&h.store, "deep@example.com", "DEEP2345", 150).await;

    let wave = h.waves.create_wave(wave_request("first", 1, 100)).await.unwrap();
    assert!(!wave.is_active);

    let granted = h.waves.activate_wave(wave.id).await.unwrap();
    assert_eq!(granted, 1);

    let in_range = h.store.find_user(in_range.id).await.unwrap().unwrap();
    assert!(in_range.access_granted);
    assert_eq!(in_range.wave_id, Some(wave.id));

    let out_of_range = h.store.find_user(out_of_range.id).await.unwrap().unwrap();
    assert!(!out_of_range.access_granted);
    assert!(out_of_range.wave_id.is_none());

    let wave = h.waves.get_wave(wave.id).await.unwrap();
    assert!(wave.is_active);
    assert!(wave.activated_at.is_some());
}

#[tokio::test]
async fn test_deactivation_revokes_but_keeps_membership() {
    let h = harness();
    let user = seed_user(&h.store, "fifty@example.com", "FIFTY234", 50).await;
    let wave = h.waves.create_wave(wave_request("first", 1, 100)).await.unwrap();

    h.waves.activate_wave(wave.id).await.unwrap();
    let revoked = h.waves.deactivate_wave(wave.id).await.unwrap();
    assert_eq!(revoked, 1);

    let user = h.store.find_user(user.id).await.unwrap().unwrap();
    assert!(!user.access_granted);
    assert_eq!(user.wave_id, Some(wave.id), "membership survives deactivation");

    let wave = h.waves.get_wave(wave.id).await.unwrap();
    assert!(!wave.is_active);
    assert!(wave.activated_at.is_none());
}

#[tokio::test]
async fn test_active_wave_is_immutable() {
    let h = harness();
    let wave = h.waves.create_wave(wave_request("first", 1, 100)).await.unwrap();
    h.waves.activate_wave(wave.id).await.unwrap();

    let result = h
        .waves
        .update_wave(
            wave.id,
            UpdateWaveRequest {
                name: None,
                description: None,
                start_position: Some(10),
                end_position: None,
            },
        )
        .await;
    assert!(matches!(result, Err(WaveError::ActiveWaveImmutable)));

    // Deactivate, then the edit goes through
    h.waves.deactivate_wave(wave.id).await.unwrap();
    let updated = h
        .waves
        .update_wave(
            wave.id,
            UpdateWaveRequest {
                name: Some("renamed".to_string()),
                description: None,
                start_position: Some(10),
                end_position: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "renamed");
    assert_eq!(updated.start_position, 10);
}

#[tokio::test]
async fn test_invalid_ranges_are_rejected() {
    let h = harness();

    let result = h.waves.create_wave(wave_request("bad", 100, 1)).await;
    assert!(matches!(result, Err(WaveError::InvalidRange)));

    // An update may not invert the stored range either
    let wave = h.waves.create_wave(wave_request("ok", 1, 100)).await.unwrap();
    let result = h
        .waves
        .update_wave(
            wave.id,
            UpdateWaveRequest {
                name: None,
                description: None,
                start_position: Some(200),
                end_position: None,
            },
        )
        .await;
    assert!(matches!(result, Err(WaveError::InvalidRange)));
}

#[tokio::test]
async fn test_assignment_is_idempotent() {
    let h = harness();
    seed_user(&h.store, "a@example.com", "AAAA2345", 5).await;
    seed_user(&h.store, "b@example.com", "BBBB2345", 150).await;
    seed_user(&h.store, "c@example.com", "CCCC2345", 9999).await;

    let first_wave = h.waves.create_wave(wave_request("first", 1, 100)).await.unwrap();
    h.waves.create_wave(wave_request("second", 101, 200)).await.unwrap();
    h.waves.activate_wave(first_wave.id).await.unwrap();

    let first_run = h.waves.assign_users_to_waves().await.unwrap();
    assert!(first_run >= 1, "first run must assign the rank-150 user");

    let second_run = h.waves.assign_users_to_waves().await.unwrap();
    assert_eq!(
        second_run, 0,
        "unchanged ranks and waves must produce no additional writes"
    );
}

#[tokio::test]
async fn test_delete_wave_detaches_users_first() {
    let h = harness();
    let user = seed_user(&h.store, "fifty@example.com", "FIFTY234", 50).await;
    let wave = h.waves.create_wave(wave_request("first", 1, 100)).await.unwrap();
    h.waves.activate_wave(wave.id).await.unwrap();

    let detached = h.waves.delete_wave(wave.id).await.unwrap();
    assert_eq!(detached, 1);

    let user = h.store.find_user(user.id).await.unwrap().unwrap();
    assert!(user.wave_id.is_none());
    assert!(!user.access_granted);

    let result = h.waves.get_wave(wave.id).await;
    assert!(matches!(result, Err(WaveError::NotFound)));
}

#[tokio::test]
async fn test_lifecycle_operations_on_missing_wave() {
    let h = harness();
    let ghost = Uuid::new_v4();

    assert!(matches!(h.waves.activate_wave(ghost).await, Err(WaveError::NotFound)));
    assert!(matches!(h.waves.deactivate_wave(ghost).await, Err(WaveError::NotFound)));
    assert!(matches!(h.waves.delete_wave(ghost).await, Err(WaveError::NotFound)));
}

#[tokio::test]
async fn test_activation_is_idempotent() {
    let h = harness();
    seed_user(&h.store, "fifty@example.com", "FIFTY234", 50).await;
    let wave = h.waves.create_wave(wave_request("first", 1, 100)).await.unwrap();

    assert_eq!(h.waves.activate_wave(wave.id).await.unwrap(), 1);
    assert_eq!(
        h.waves.activate_wave(wave.id).await.unwrap(),
        0,
        "re-activating an active wave is a no-op"
    );
}
