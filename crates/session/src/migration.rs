//! One-time transfer of guest activity into server storage after signup.
//!
//! Steps run in a fixed order and every insert skips rows that already
//! exist, so a failed migration can simply be run again. The guest store is
//! cleared only after every step succeeded.

use std::fmt;

use booklove_core::guest::GuestStore;
use booklove_core::types::UserId;
use serde::Serialize;

use crate::data_store::{MatchRecord, Preferences, UserDataStore};
use crate::error::DataStoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStep {
    Preferences,
    Matches,
    Passes,
    ReadBooks,
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MigrationStep::Preferences => "preferences",
            MigrationStep::Matches => "matches",
            MigrationStep::Passes => "passes",
            MigrationStep::ReadBooks => "read books",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Guest migration failed at {step}: {source}")]
pub struct MigrationError {
    pub step: MigrationStep,
    #[source]
    pub source: DataStoreError,
}

/// Outcome of a migration. Counts are rows actually inserted, so a repeated
/// run reports zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// False when there was no guest state to carry over.
    pub migrated: bool,
    pub matches_inserted: u64,
    pub passes_inserted: u64,
    pub read_books_inserted: u64,
}

/// Copy the guest's preferences, matches, passes and read books to
/// `user_id`, then clear the guest store.
///
/// On failure the guest store is left untouched and the error names the
/// step that failed.
pub async fn migrate_guest_to_user(
    guest: &GuestStore,
    data: &dyn UserDataStore,
    user_id: UserId,
) -> Result<MigrationReport, MigrationError> {
    let Some(state) = guest.get() else {
        tracing::debug!(%user_id, "No guest state to migrate");
        return Ok(MigrationReport::default());
    };

    tracing::info!(
        %user_id,
        visitor_id = %state.visitor_id,
        matches = state.matches.len(),
        passes = state.passed_character_ids.len(),
        read_books = state.read_book_ids.len(),
        "Migrating guest state"
    );

    let preferences = Preferences {
        genres: state.genre_preferences,
        prefers_spicy: state.prefers_spicy,
    };
    data.save_preferences(user_id, &preferences)
        .await
        .map_err(at(MigrationStep::Preferences, user_id))?;

    let matches: Vec<MatchRecord> = state.matches.into_iter().map(MatchRecord::from).collect();
    let matches_inserted = data
        .insert_matches_ignoring_conflicts(user_id, &matches)
        .await
        .map_err(at(MigrationStep::Matches, user_id))?;

    let passes: Vec<String> = state.passed_character_ids.into_iter().collect();
    let passes_inserted = data
        .insert_passes_ignoring_conflicts(user_id, &passes)
        .await
        .map_err(at(MigrationStep::Passes, user_id))?;

    let read_books: Vec<String> = state.read_book_ids.into_iter().collect();
    let read_books_inserted = data
        .insert_read_books_ignoring_conflicts(user_id, &read_books)
        .await
        .map_err(at(MigrationStep::ReadBooks, user_id))?;

    guest.clear();

    let report = MigrationReport {
        migrated: true,
        matches_inserted,
        passes_inserted,
        read_books_inserted,
    };
    tracing::info!(
        %user_id,
        matches_inserted,
        passes_inserted,
        read_books_inserted,
        "Guest migration complete"
    );
    Ok(report)
}

fn at(step: MigrationStep, user_id: UserId) -> impl FnOnce(DataStoreError) -> MigrationError {
    move |source| {
        tracing::error!(%user_id, %step, error = %source, "Guest migration failed");
        MigrationError { step, source }
    }
}
