//! Command implementations, kept apart from argument parsing so they can be
//! driven directly in tests.

use std::path::Path;
use std::sync::Arc;

use booklove_core::guest::{
    actions, FileStorage, GuestState, GuestStore, ReturnVisit, GUEST_STORAGE_KEY,
};
use booklove_core::types::UserId;
use booklove_db::DbPool;
use booklove_session::{migrate_guest_to_user, MigrationReport, PgUserDataStore};
use serde::Serialize;

/// Open the guest slot kept under `state_dir`.
pub fn open_guest_store(state_dir: &Path) -> GuestStore {
    GuestStore::new(Arc::new(FileStorage::new(state_dir, GUEST_STORAGE_KEY)))
}

/// What `inspect` prints.
#[derive(Debug, Serialize)]
pub struct GuestReport {
    pub available: bool,
    pub return_visit: ReturnVisit,
    pub should_show_signup_prompt: bool,
    pub has_unread_matches: bool,
    pub state: Option<GuestState>,
}

/// Describe the stored guest state without creating one for a first-time
/// visitor.
///
/// Checking availability creates `state_dir` if it is missing and briefly
/// writes a scratch file there. A legacy-shaped slot is rewritten in the
/// current shape on read.
pub fn inspect(store: &GuestStore) -> GuestReport {
    let state = store.get();
    GuestReport {
        available: store.is_available(),
        return_visit: store.return_visit(),
        should_show_signup_prompt: state
            .as_ref()
            .is_some_and(GuestState::should_show_signup_prompt),
        has_unread_matches: state.as_ref().is_some_and(GuestState::has_unread_matches),
        state,
    }
}

/// Forget passes, or with `all` delete the guest slot entirely.
pub fn reset(store: &GuestStore, all: bool) -> Option<GuestState> {
    if all {
        store.clear();
        tracing::info!("Cleared guest state");
        return None;
    }
    let state = actions::reset_passes(store);
    tracing::info!(applied = state.is_some(), "Reset guest passes");
    state
}

/// Carry the stored guest state over to `user_id`.
pub async fn migrate(
    store: &GuestStore,
    pool: DbPool,
    user_id: UserId,
) -> anyhow::Result<MigrationReport> {
    booklove_db::run_migrations(&pool).await?;
    let data = PgUserDataStore::new(pool);
    Ok(migrate_guest_to_user(store, &data, user_id).await?)
}

/// Confirm the database is reachable and its schema is current.
pub async fn db_check(pool: &DbPool) -> anyhow::Result<()> {
    booklove_db::health_check(pool).await?;
    tracing::info!("Database health check passed");
    booklove_db::run_migrations(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
