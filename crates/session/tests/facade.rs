//! Integration tests for the mode-aware user state facade.
//!
//! Covers both modes against in-memory guest storage and data store:
//! - Guest operations persist to the guest store and publish snapshots
//! - Authenticated writes are optimistic, treat duplicates as success, and
//!   keep local state when the server write fails
//! - Sign-in, sign-out and refresh

use std::sync::Arc;

use assert_matches::assert_matches;
use booklove_core::error::CoreError;
use booklove_core::guest::{GuestStore, MemoryStorage};
use booklove_session::{
    AuthSession, DataStoreError, MemoryUserDataStore, SessionError, SessionMode, StoreOp,
    UserDataStore, UserState,
};
use indexmap::IndexSet;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn setup() -> (UserState, GuestStore, Arc<MemoryUserDataStore>) {
    let guest = GuestStore::new(Arc::new(MemoryStorage::new()));
    let data = Arc::new(MemoryUserDataStore::new());
    let state = UserState::new(guest.clone(), data.clone());
    (state, guest, data)
}

async fn signed_in() -> (UserState, Uuid, Arc<MemoryUserDataStore>) {
    let (state, _guest, data) = setup();
    let user_id = Uuid::new_v4();
    state.sign_in(AuthSession { user_id }).await.unwrap();
    (state, user_id, data)
}

// ---------------------------------------------------------------------------
// Guest mode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_guest_mode_starts_with_new_visitor() {
    let (state, guest, _data) = setup();
    let snap = state.snapshot();

    assert!(snap.is_guest());
    assert!(snap.is_new_visitor);
    let stored = guest.get().expect("guest state created on start");
    assert_eq!(
        snap.mode,
        SessionMode::Guest {
            visitor_id: Some(stored.visitor_id)
        }
    );
}

#[tokio::test]
async fn test_returning_guest_is_not_new() {
    let guest = GuestStore::new(Arc::new(MemoryStorage::new()));
    guest.init();
    let state = UserState::new(guest, Arc::new(MemoryUserDataStore::new()));
    assert!(!state.snapshot().is_new_visitor);
}

#[tokio::test]
async fn test_guest_actions_persist_and_publish() {
    let (state, guest, _data) = setup();
    let mut rx = state.subscribe();

    state.add_match("a", Some("b")).await.unwrap();
    state.add_pass("b", Some("c")).await.unwrap();
    state.mark_book_read("book-1").await.unwrap();

    assert!(rx.has_changed().unwrap());
    let snap = rx.borrow_and_update().clone();
    assert_eq!(snap.matched_character_ids(), vec!["a"]);
    assert!(snap.passed_character_ids.contains("b"));
    assert!(snap.read_book_ids.contains("book-1"));
    assert_eq!(snap.current_character_id.as_deref(), Some("c"));
    assert!(snap.has_unread_matches());

    let stored = guest.get().expect("guest state");
    assert_eq!(stored.matched_character_ids(), vec!["a"]);
}

#[tokio::test]
async fn test_guest_signup_prompt_threshold() {
    let (state, _guest, _data) = setup();
    for id in ["a", "b", "c"] {
        state.add_match(id, None).await.unwrap();
    }
    assert!(state.snapshot().should_show_signup_prompt());

    state.add_match("d", None).await.unwrap();
    assert!(!state.snapshot().should_show_signup_prompt());

    state.remove_match("d").await.unwrap();
    state.dismiss_signup_prompt().await.unwrap();
    assert!(!state.snapshot().should_show_signup_prompt());
}

#[tokio::test]
async fn test_guest_mode_survives_unavailable_storage() {
    let guest = GuestStore::new(Arc::new(MemoryStorage::unavailable()));
    let state = UserState::new(guest, Arc::new(MemoryUserDataStore::new()));

    state.add_match("a", None).await.unwrap();
    assert_eq!(state.snapshot().matched_character_ids(), vec!["a"]);
    assert!(state.guest_store().is_available());
}

#[tokio::test]
async fn test_empty_ids_are_rejected() {
    let (state, _guest, _data) = setup();
    let mut rx = state.subscribe();

    assert_matches!(
        state.add_match("", None).await,
        Err(SessionError::Core(CoreError::Validation(_)))
    );
    assert_matches!(
        state.mark_book_read("  ").await,
        Err(SessionError::Core(CoreError::Validation(_)))
    );
    assert!(!rx.has_changed().unwrap());
}

#[tokio::test]
async fn test_guest_preferences_and_reset() {
    let (state, _guest, _data) = setup();
    state
        .set_preferences(IndexSet::from(["romance".to_string()]), Some(true))
        .await
        .unwrap();
    state.add_match("a", Some("b")).await.unwrap();
    state.add_pass("b", Some("c")).await.unwrap();

    state.reset_passes().await.unwrap();
    let snap = state.snapshot();
    assert!(snap.passed_character_ids.is_empty());
    assert_eq!(snap.matched_character_ids(), vec!["a"]);
    assert_eq!(snap.current_character_id, None);
    assert!(snap.genre_preferences().contains("romance"));
    assert_eq!(snap.prefers_spicy(), Some(true));

    state.reset_all().await.unwrap();
    assert!(state.snapshot().matches.is_empty());
}

// ---------------------------------------------------------------------------
// Authenticated mode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sign_in_loads_server_activity() {
    let (state, _guest, data) = setup();
    let user_id = Uuid::new_v4();
    data.insert_match(user_id, "server-match").await.unwrap();
    data.insert_pass(user_id, "server-pass").await.unwrap();

    state.sign_in(AuthSession { user_id }).await.unwrap();

    let snap = state.snapshot();
    assert_eq!(snap.user_id(), Some(user_id));
    assert_eq!(snap.matched_character_ids(), vec!["server-match"]);
    assert!(snap.passed_character_ids.contains("server-pass"));
    assert!(!snap.should_show_signup_prompt());
    assert!(!snap.is_new_visitor);
}

#[tokio::test]
async fn test_authenticated_writes_reach_the_store() {
    let (state, user_id, data) = signed_in().await;

    state.add_match("a", Some("b")).await.unwrap();
    state.add_pass("b", Some("c")).await.unwrap();
    state.mark_book_read("book").await.unwrap();
    state.mark_match_read("a").await.unwrap();
    state
        .set_preferences(IndexSet::from(["fantasy".to_string()]), None)
        .await
        .unwrap();

    let stored = data.activity(user_id).expect("activity");
    assert_eq!(stored.matches.len(), 1);
    assert!(stored.matches[0].is_read);
    assert!(stored.passed_character_ids.contains("b"));
    assert!(stored.read_book_ids.contains("book"));
    assert!(stored.preferences.genres.contains("fantasy"));

    let snap = state.snapshot();
    assert_eq!(snap.current_character_id.as_deref(), Some("c"));
    assert!(!snap.has_unread_matches());
}

#[tokio::test]
async fn test_duplicate_insert_is_success() {
    let (state, user_id, data) = signed_in().await;
    data.insert_match(user_id, "a").await.unwrap();

    state.add_match("a", None).await.unwrap();
    state.add_match("a", None).await.unwrap();
    state.mark_book_read("book").await.unwrap();
    state.mark_book_read("book").await.unwrap();

    assert_eq!(state.snapshot().matches.len(), 1);
    assert_eq!(data.activity(user_id).expect("activity").matches.len(), 1);
}

#[tokio::test]
async fn test_failed_write_keeps_optimistic_state() {
    let (state, user_id, data) = signed_in().await;
    let mut rx = state.subscribe();

    data.fail_next(StoreOp::InsertMatch);
    let err = state.add_match("a", None).await.unwrap_err();
    assert_matches!(err, SessionError::DataStore(DataStoreError::Unavailable(_)));

    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow().matched_character_ids(), vec!["a"]);
    assert!(data.activity(user_id).expect("activity").matches.is_empty());

    state.refresh().await.unwrap();
    assert!(state.snapshot().matches.is_empty());
}

#[tokio::test]
async fn test_authenticated_reset_all_clears_server_rows() {
    let (state, user_id, data) = signed_in().await;
    state.add_match("a", Some("b")).await.unwrap();
    state.add_pass("b", Some("c")).await.unwrap();

    state.reset_all().await.unwrap();

    let stored = data.activity(user_id).expect("activity");
    assert!(stored.matches.is_empty());
    assert!(stored.passed_character_ids.is_empty());
    assert_eq!(state.snapshot().current_character_id, None);
}

#[tokio::test]
async fn test_sign_in_with_failed_fetch_still_switches_mode() {
    let (state, _guest, data) = setup();
    let user_id = Uuid::new_v4();
    data.insert_match(user_id, "a").await.unwrap();
    data.fail_next(StoreOp::FetchActivity);

    assert!(state.sign_in(AuthSession { user_id }).await.is_err());
    let snap = state.snapshot();
    assert_eq!(snap.user_id(), Some(user_id));
    assert!(snap.matches.is_empty());

    state.refresh().await.unwrap();
    assert_eq!(state.snapshot().matched_character_ids(), vec!["a"]);
}

#[tokio::test]
async fn test_sign_out_resumes_guest_state() {
    let (state, guest, _data) = setup();
    state.add_match("guest-a", None).await.unwrap();

    state.sign_in(AuthSession { user_id: Uuid::new_v4() }).await.unwrap();
    assert!(state.snapshot().matches.is_empty());
    assert!(guest.get().is_some());

    state.sign_out().await;
    let snap = state.snapshot();
    assert!(snap.is_guest());
    assert_eq!(snap.matched_character_ids(), vec!["guest-a"]);
}
