//! Server-side persistence of an authenticated user's activity.

use async_trait::async_trait;
use booklove_core::guest::GuestMatch;
use booklove_core::types::{BookId, CharacterId, Timestamp, UserId};
use booklove_db::models::user_match::{NewUserMatch, UserMatch};
use indexmap::IndexSet;
use serde::Serialize;

use crate::error::DataStoreError;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A match as seen by the session layer, in either mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    pub character_id: CharacterId,
    /// `None` for guest matches carried over from the legacy schema.
    pub matched_at: Option<Timestamp>,
    pub is_read: bool,
}

impl From<GuestMatch> for MatchRecord {
    fn from(m: GuestMatch) -> Self {
        Self {
            character_id: m.character_id,
            matched_at: m.matched_at,
            is_read: m.is_read,
        }
    }
}

impl From<UserMatch> for MatchRecord {
    fn from(row: UserMatch) -> Self {
        Self {
            character_id: row.character_id,
            matched_at: Some(row.created_at),
            is_read: row.is_read,
        }
    }
}

impl From<&MatchRecord> for NewUserMatch {
    fn from(m: &MatchRecord) -> Self {
        Self {
            character_id: m.character_id.clone(),
            is_read: m.is_read,
            matched_at: m.matched_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Preferences {
    pub genres: IndexSet<String>,
    pub prefers_spicy: Option<bool>,
}

/// Everything fetched for a user when entering authenticated mode.
///
/// Collections are in insertion order, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserActivity {
    pub matches: Vec<MatchRecord>,
    pub passed_character_ids: IndexSet<CharacterId>,
    pub read_book_ids: IndexSet<BookId>,
    pub preferences: Preferences,
}

// ---------------------------------------------------------------------------
// UserDataStore
// ---------------------------------------------------------------------------

/// Row-level access to a user's server-side activity.
///
/// Single inserts report an existing row as [`DataStoreError::Duplicate`];
/// bulk inserts skip existing rows and return how many were written.
#[async_trait]
pub trait UserDataStore: Send + Sync {
    /// Fetch all activity for a user, creating an empty profile if needed.
    async fn fetch_activity(&self, user_id: UserId) -> Result<UserActivity, DataStoreError>;

    async fn insert_match(
        &self,
        user_id: UserId,
        character_id: &str,
    ) -> Result<MatchRecord, DataStoreError>;

    async fn mark_match_read(
        &self,
        user_id: UserId,
        character_id: &str,
    ) -> Result<(), DataStoreError>;

    async fn delete_match(&self, user_id: UserId, character_id: &str) -> Result<(), DataStoreError>;

    async fn delete_all_matches(&self, user_id: UserId) -> Result<(), DataStoreError>;

    async fn insert_pass(&self, user_id: UserId, character_id: &str) -> Result<(), DataStoreError>;

    async fn delete_pass(&self, user_id: UserId, character_id: &str) -> Result<(), DataStoreError>;

    async fn delete_all_passes(&self, user_id: UserId) -> Result<(), DataStoreError>;

    async fn insert_read_book(&self, user_id: UserId, book_id: &str) -> Result<(), DataStoreError>;

    async fn delete_read_book(&self, user_id: UserId, book_id: &str) -> Result<(), DataStoreError>;

    /// Overwrite the user's preferences, creating the profile if needed.
    async fn save_preferences(
        &self,
        user_id: UserId,
        preferences: &Preferences,
    ) -> Result<(), DataStoreError>;

    async fn insert_matches_ignoring_conflicts(
        &self,
        user_id: UserId,
        matches: &[MatchRecord],
    ) -> Result<u64, DataStoreError>;

    async fn insert_passes_ignoring_conflicts(
        &self,
        user_id: UserId,
        character_ids: &[CharacterId],
    ) -> Result<u64, DataStoreError>;

    async fn insert_read_books_ignoring_conflicts(
        &self,
        user_id: UserId,
        book_ids: &[BookId],
    ) -> Result<u64, DataStoreError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
