//! Integration tests for [`PgUserDataStore`] and migration against
//! PostgreSQL.
//!
//! Run with `DATABASE_URL` set and `cargo test -- --ignored`.

use std::sync::Arc;

use assert_matches::assert_matches;
use booklove_core::guest::{actions, GuestStore, MemoryStorage};
use booklove_session::{
    migrate_guest_to_user, AuthSession, DataStoreError, PgUserDataStore, UserDataStore, UserState,
};
use sqlx::PgPool;
use uuid::Uuid;

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_fetch_creates_profile(pool: PgPool) {
    let store = PgUserDataStore::new(pool.clone());
    let user_id = Uuid::new_v4();

    let activity = store.fetch_activity(user_id).await.unwrap();
    assert!(activity.matches.is_empty());
    assert!(activity.preferences.genres.is_empty());

    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM user_profiles WHERE id = $1)")
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(exists.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_duplicate_insert_maps_to_duplicate(pool: PgPool) {
    let store = PgUserDataStore::new(pool);
    let user_id = Uuid::new_v4();
    store.fetch_activity(user_id).await.unwrap();

    store.insert_match(user_id, "a").await.unwrap();
    assert_matches!(
        store.insert_match(user_id, "a").await,
        Err(DataStoreError::Duplicate)
    );
    store.insert_pass(user_id, "b").await.unwrap();
    assert_matches!(
        store.insert_pass(user_id, "b").await,
        Err(DataStoreError::Duplicate)
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_activity_is_oldest_first(pool: PgPool) {
    let store = PgUserDataStore::new(pool);
    let user_id = Uuid::new_v4();
    store.fetch_activity(user_id).await.unwrap();

    for id in ["first", "second", "third"] {
        store.insert_match(user_id, id).await.unwrap();
    }

    let activity = store.fetch_activity(user_id).await.unwrap();
    let ids: Vec<_> = activity.matches.iter().map(|m| m.character_id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second", "third"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_signup_migrates_into_postgres(pool: PgPool) {
    let guest = GuestStore::new(Arc::new(MemoryStorage::new()));
    actions::record_match(&guest, "a", None);
    actions::record_pass(&guest, "b", None);
    actions::mark_book_read(&guest, "book");

    let data = Arc::new(PgUserDataStore::new(pool));
    let state = UserState::new(guest.clone(), data.clone());
    let user_id = Uuid::new_v4();

    let report = state.handle_signup(AuthSession { user_id }).await.unwrap();
    assert_eq!(report.matches_inserted, 1);
    assert!(guest.get().is_none());
    assert_eq!(state.snapshot().matched_character_ids(), vec!["a"]);

    let again = migrate_guest_to_user(&guest, data.as_ref(), user_id).await.unwrap();
    assert!(!again.migrated);
}
