//! In-process [`UserDataStore`] with failure injection.
//!
//! Mirrors the unique constraints of the PostgreSQL schema so callers see
//! the same `Duplicate` behavior without a database.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use booklove_core::types::{BookId, CharacterId, UserId};
use chrono::Utc;

use crate::data_store::{MatchRecord, Preferences, UserActivity, UserDataStore};
use crate::error::DataStoreError;

/// A store operation that can be made to fail on its next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    FetchActivity,
    InsertMatch,
    MarkMatchRead,
    DeleteMatch,
    DeleteAllMatches,
    InsertPass,
    DeletePass,
    DeleteAllPasses,
    InsertReadBook,
    DeleteReadBook,
    SavePreferences,
    BulkMatches,
    BulkPasses,
    BulkReadBooks,
}

#[derive(Default)]
struct Inner {
    users: HashMap<UserId, UserActivity>,
    failures: HashSet<StoreOp>,
}

#[derive(Default)]
pub struct MemoryUserDataStore {
    inner: Mutex<Inner>,
}

impl MemoryUserDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `op` fail with [`DataStoreError::Unavailable`].
    pub fn fail_next(&self, op: StoreOp) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failures.insert(op);
        }
    }

    /// Current rows for a user, if any were ever written.
    pub fn activity(&self, user_id: UserId) -> Option<UserActivity> {
        self.inner.lock().ok()?.users.get(&user_id).cloned()
    }

    /// Lock the store, consuming an injected failure for `op` if one is set.
    fn begin(&self, op: StoreOp) -> Result<MutexGuard<'_, Inner>, DataStoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| DataStoreError::Unavailable("store lock poisoned".into()))?;
        if inner.failures.remove(&op) {
            return Err(DataStoreError::Unavailable(format!("injected {op:?} failure")));
        }
        Ok(inner)
    }

    fn with_user<T>(
        &self,
        op: StoreOp,
        user_id: UserId,
        f: impl FnOnce(&mut UserActivity) -> Result<T, DataStoreError>,
    ) -> Result<T, DataStoreError> {
        let mut inner = self.begin(op)?;
        f(inner.users.entry(user_id).or_default())
    }
}

#[async_trait]
impl UserDataStore for MemoryUserDataStore {
    async fn fetch_activity(&self, user_id: UserId) -> Result<UserActivity, DataStoreError> {
        self.with_user(StoreOp::FetchActivity, user_id, |user| Ok(user.clone()))
    }

    async fn insert_match(
        &self,
        user_id: UserId,
        character_id: &str,
    ) -> Result<MatchRecord, DataStoreError> {
        self.with_user(StoreOp::InsertMatch, user_id, |user| {
            if user.matches.iter().any(|m| m.character_id == character_id) {
                return Err(DataStoreError::Duplicate);
            }
            let record = MatchRecord {
                character_id: character_id.to_string(),
                matched_at: Some(Utc::now()),
                is_read: false,
            };
            user.matches.push(record.clone());
            Ok(record)
        })
    }

    async fn mark_match_read(
        &self,
        user_id: UserId,
        character_id: &str,
    ) -> Result<(), DataStoreError> {
        self.with_user(StoreOp::MarkMatchRead, user_id, |user| {
            for m in user.matches.iter_mut().filter(|m| m.character_id == character_id) {
                m.is_read = true;
            }
            Ok(())
        })
    }

    async fn delete_match(&self, user_id: UserId, character_id: &str) -> Result<(), DataStoreError> {
        self.with_user(StoreOp::DeleteMatch, user_id, |user| {
            user.matches.retain(|m| m.character_id != character_id);
            Ok(())
        })
    }

    async fn delete_all_matches(&self, user_id: UserId) -> Result<(), DataStoreError> {
        self.with_user(StoreOp::DeleteAllMatches, user_id, |user| {
            user.matches.clear();
            Ok(())
        })
    }

    async fn insert_pass(&self, user_id: UserId, character_id: &str) -> Result<(), DataStoreError> {
        self.with_user(StoreOp::InsertPass, user_id, |user| {
            if !user.passed_character_ids.insert(character_id.to_string()) {
                return Err(DataStoreError::Duplicate);
            }
            Ok(())
        })
    }

    async fn delete_pass(&self, user_id: UserId, character_id: &str) -> Result<(), DataStoreError> {
        self.with_user(StoreOp::DeletePass, user_id, |user| {
            user.passed_character_ids.shift_remove(character_id);
            Ok(())
        })
    }

    async fn delete_all_passes(&self, user_id: UserId) -> Result<(), DataStoreError> {
        self.with_user(StoreOp::DeleteAllPasses, user_id, |user| {
            user.passed_character_ids.clear();
            Ok(())
        })
    }

    async fn insert_read_book(&self, user_id: UserId, book_id: &str) -> Result<(), DataStoreError> {
        self.with_user(StoreOp::InsertReadBook, user_id, |user| {
            if !user.read_book_ids.insert(book_id.to_string()) {
                return Err(DataStoreError::Duplicate);
            }
            Ok(())
        })
    }

    async fn delete_read_book(&self, user_id: UserId, book_id: &str) -> Result<(), DataStoreError> {
        self.with_user(StoreOp::DeleteReadBook, user_id, |user| {
            user.read_book_ids.shift_remove(book_id);
            Ok(())
        })
    }

    async fn save_preferences(
        &self,
        user_id: UserId,
        preferences: &Preferences,
    ) -> Result<(), DataStoreError> {
        self.with_user(StoreOp::SavePreferences, user_id, |user| {
            user.preferences = preferences.clone();
            Ok(())
        })
    }

    async fn insert_matches_ignoring_conflicts(
        &self,
        user_id: UserId,
        matches: &[MatchRecord],
    ) -> Result<u64, DataStoreError> {
        self.with_user(StoreOp::BulkMatches, user_id, |user| {
            let mut inserted = 0;
            for m in matches {
                if user.matches.iter().any(|e| e.character_id == m.character_id) {
                    continue;
                }
                user.matches.push(MatchRecord {
                    matched_at: m.matched_at.or_else(|| Some(Utc::now())),
                    ..m.clone()
                });
                inserted += 1;
            }
            Ok(inserted)
        })
    }

    async fn insert_passes_ignoring_conflicts(
        &self,
        user_id: UserId,
        character_ids: &[CharacterId],
    ) -> Result<u64, DataStoreError> {
        self.with_user(StoreOp::BulkPasses, user_id, |user| {
            Ok(character_ids
                .iter()
                .filter(|id| user.passed_character_ids.insert((*id).clone()))
                .count() as u64)
        })
    }

    async fn insert_read_books_ignoring_conflicts(
        &self,
        user_id: UserId,
        book_ids: &[BookId],
    ) -> Result<u64, DataStoreError> {
        self.with_user(StoreOp::BulkReadBooks, user_id, |user| {
            Ok(book_ids
                .iter()
                .filter(|id| user.read_book_ids.insert((*id).clone()))
                .count() as u64)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
