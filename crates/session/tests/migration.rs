//! Integration tests for guest-to-user migration.
//!
//! - Guest activity lands in the data store with read flags and timestamps
//! - Re-running is safe and inserts nothing new
//! - A failing step leaves the guest store intact for a retry
//! - Signup through the facade migrates and then signs in

use std::sync::Arc;

use assert_matches::assert_matches;
use booklove_core::guest::{actions, GuestStore, MemoryStorage};
use booklove_session::{
    migrate_guest_to_user, AuthSession, MemoryUserDataStore, MigrationError, MigrationReport,
    MigrationStep, SessionError, StoreOp, UserState,
};
use indexmap::IndexSet;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn guest_with_activity() -> GuestStore {
    let guest = GuestStore::new(Arc::new(MemoryStorage::new()));
    actions::record_match(&guest, "a", None);
    actions::record_match(&guest, "b", None);
    actions::mark_match_read(&guest, "a");
    actions::record_pass(&guest, "c", None);
    actions::mark_book_read(&guest, "book-1");
    actions::set_preferences(&guest, IndexSet::from(["romance".to_string()]), Some(false));
    guest
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_migration_copies_everything_and_clears_guest() {
    let guest = guest_with_activity();
    let guest_matches = guest.get().expect("guest").matches;
    let data = MemoryUserDataStore::new();
    let user_id = Uuid::new_v4();

    let report = migrate_guest_to_user(&guest, &data, user_id).await.unwrap();
    assert_eq!(
        report,
        MigrationReport {
            migrated: true,
            matches_inserted: 2,
            passes_inserted: 1,
            read_books_inserted: 1,
        }
    );
    assert!(guest.get().is_none());

    let stored = data.activity(user_id).expect("activity");
    let a = stored.matches.iter().find(|m| m.character_id == "a").expect("a");
    assert!(a.is_read);
    assert_eq!(a.matched_at, guest_matches[0].matched_at);
    assert!(stored.passed_character_ids.contains("c"));
    assert!(stored.read_book_ids.contains("book-1"));
    assert!(stored.preferences.genres.contains("romance"));
    assert_eq!(stored.preferences.prefers_spicy, Some(false));
}

#[tokio::test]
async fn test_legacy_matches_get_a_timestamp() {
    let storage = Arc::new(MemoryStorage::with_value(
        r#"{"visitorId":"v","matchedCharacterIds":["x"],"passedCharacterIds":[]}"#,
    ));
    let guest = GuestStore::new(storage);
    let data = MemoryUserDataStore::new();
    let user_id = Uuid::new_v4();

    migrate_guest_to_user(&guest, &data, user_id).await.unwrap();

    let stored = data.activity(user_id).expect("activity");
    assert_eq!(stored.matches.len(), 1);
    assert!(stored.matches[0].is_read);
    assert!(stored.matches[0].matched_at.is_some());
}

#[tokio::test]
async fn test_migration_without_guest_state_is_empty() {
    let guest = GuestStore::new(Arc::new(MemoryStorage::new()));
    let data = MemoryUserDataStore::new();
    let user_id = Uuid::new_v4();

    let report = migrate_guest_to_user(&guest, &data, user_id).await.unwrap();
    assert_eq!(report, MigrationReport::default());
    assert!(data.activity(user_id).is_none());
}

#[tokio::test]
async fn test_failed_step_keeps_guest_state_and_retry_succeeds() {
    let guest = guest_with_activity();
    let data = MemoryUserDataStore::new();
    let user_id = Uuid::new_v4();

    data.fail_next(StoreOp::BulkPasses);
    let err = migrate_guest_to_user(&guest, &data, user_id).await.unwrap_err();
    assert_matches!(
        err,
        MigrationError {
            step: MigrationStep::Passes,
            ..
        }
    );
    assert!(guest.get().is_some(), "guest state must survive a failed migration");

    let report = migrate_guest_to_user(&guest, &data, user_id).await.unwrap();
    assert_eq!(report.matches_inserted, 0, "matches were already copied");
    assert_eq!(report.passes_inserted, 1);
    assert_eq!(report.read_books_inserted, 1);
    assert!(guest.get().is_none());

    let stored = data.activity(user_id).expect("activity");
    assert_eq!(stored.matches.len(), 2);
}

#[tokio::test]
async fn test_migration_is_idempotent() {
    let data = MemoryUserDataStore::new();
    let user_id = Uuid::new_v4();

    migrate_guest_to_user(&guest_with_activity(), &data, user_id)
        .await
        .unwrap();
    let second = migrate_guest_to_user(&guest_with_activity(), &data, user_id)
        .await
        .unwrap();

    assert!(second.migrated);
    assert_eq!(second.matches_inserted, 0);
    assert_eq!(second.passes_inserted, 0);
    assert_eq!(second.read_books_inserted, 0);
    assert_eq!(data.activity(user_id).expect("activity").matches.len(), 2);
}

#[tokio::test]
async fn test_handle_signup_migrates_then_signs_in() {
    let guest = guest_with_activity();
    let data = Arc::new(MemoryUserDataStore::new());
    let state = UserState::new(guest.clone(), data.clone());
    let user_id = Uuid::new_v4();

    let report = state.handle_signup(AuthSession { user_id }).await.unwrap();
    assert_eq!(report.matches_inserted, 2);

    let snap = state.snapshot();
    assert_eq!(snap.user_id(), Some(user_id));
    assert_eq!(snap.matches.len(), 2);
    assert!(snap.passed_character_ids.contains("c"));
    assert!(guest.get().is_none());
}

#[tokio::test]
async fn test_handle_signup_failure_still_signs_in() {
    let guest = guest_with_activity();
    let data = Arc::new(MemoryUserDataStore::new());
    let state = UserState::new(guest.clone(), data.clone());
    let user_id = Uuid::new_v4();

    data.fail_next(StoreOp::SavePreferences);
    let err = state.handle_signup(AuthSession { user_id }).await.unwrap_err();
    assert_matches!(
        err,
        SessionError::Migration(MigrationError {
            step: MigrationStep::Preferences,
            ..
        })
    );
    assert_eq!(state.snapshot().user_id(), Some(user_id));
    assert!(guest.get().is_some());
}
