//! Mode-specific implementations behind [`UserState`](crate::UserState).
//!
//! [`GuestBackend`] routes every operation to the guest actions and never
//! touches the network. [`ServerBackend`] keeps a local cache of the user's
//! activity, patches it optimistically, then writes through to the
//! [`UserDataStore`]. A failed write is logged and returned but the local
//! patch stays; [`UserStateBackend::refresh`] reconciles with the server.

use std::sync::Arc;

use async_trait::async_trait;
use booklove_core::guest::{actions, GuestState, GuestStore};
use booklove_core::types::{CharacterId, UserId};
use chrono::Utc;

use crate::data_store::{MatchRecord, Preferences, UserActivity, UserDataStore};
use crate::error::{ignore_duplicate, DataStoreError, SessionError};
use crate::snapshot::UserSnapshot;

/// One visitor's state in a single mode.
///
/// Ids are validated by the caller before reaching a backend.
#[async_trait]
pub trait UserStateBackend: Send + Sync {
    fn snapshot(&self) -> UserSnapshot;

    /// Record a like and move the resume pointer to `next`.
    async fn add_match(
        &mut self,
        character_id: &str,
        next: Option<&str>,
    ) -> Result<(), SessionError>;

    /// Record a skip and move the resume pointer to `next`.
    async fn add_pass(
        &mut self,
        character_id: &str,
        next: Option<&str>,
    ) -> Result<(), SessionError>;

    async fn mark_book_read(&mut self, book_id: &str) -> Result<(), SessionError>;

    async fn unmark_book_read(&mut self, book_id: &str) -> Result<(), SessionError>;

    async fn remove_match(&mut self, character_id: &str) -> Result<(), SessionError>;

    async fn remove_pass(&mut self, character_id: &str) -> Result<(), SessionError>;

    /// Forget every pass and the resume pointer. Matches stay.
    async fn reset_passes(&mut self) -> Result<(), SessionError>;

    /// Forget matches, passes and the resume pointer.
    async fn reset_all(&mut self) -> Result<(), SessionError>;

    async fn mark_match_read(&mut self, character_id: &str) -> Result<(), SessionError>;

    async fn set_preferences(&mut self, preferences: Preferences) -> Result<(), SessionError>;

    async fn set_current_character(
        &mut self,
        character_id: Option<&str>,
    ) -> Result<(), SessionError>;

    async fn dismiss_signup_prompt(&mut self) -> Result<(), SessionError>;

    /// Reload from the backing store, discarding local divergence.
    async fn refresh(&mut self) -> Result<(), SessionError>;
}

// ---------------------------------------------------------------------------
// GuestBackend
// ---------------------------------------------------------------------------

pub struct GuestBackend {
    store: GuestStore,
    state: Option<GuestState>,
    is_new_visitor: bool,
}

impl GuestBackend {
    /// Load (or create) the guest state held by `store`.
    pub fn new(store: GuestStore) -> Self {
        let is_new_visitor = store.get().is_none();
        let state = store.init();
        Self {
            store,
            state,
            is_new_visitor,
        }
    }

    /// Keep the last known state when an action could not persist.
    fn apply(&mut self, next: Option<GuestState>) -> Result<(), SessionError> {
        if next.is_some() {
            self.state = next;
        }
        Ok(())
    }
}

#[async_trait]
impl UserStateBackend for GuestBackend {
    fn snapshot(&self) -> UserSnapshot {
        UserSnapshot::guest(self.state.as_ref(), self.is_new_visitor)
    }

    async fn add_match(
        &mut self,
        character_id: &str,
        next: Option<&str>,
    ) -> Result<(), SessionError> {
        let state = actions::record_match(&self.store, character_id, next);
        self.apply(state)
    }

    async fn add_pass(
        &mut self,
        character_id: &str,
        next: Option<&str>,
    ) -> Result<(), SessionError> {
        let state = actions::record_pass(&self.store, character_id, next);
        self.apply(state)
    }

    async fn mark_book_read(&mut self, book_id: &str) -> Result<(), SessionError> {
        let state = actions::mark_book_read(&self.store, book_id);
        self.apply(state)
    }

    async fn unmark_book_read(&mut self, book_id: &str) -> Result<(), SessionError> {
        let state = actions::unmark_book_read(&self.store, book_id);
        self.apply(state)
    }

    async fn remove_match(&mut self, character_id: &str) -> Result<(), SessionError> {
        let state = actions::remove_match(&self.store, character_id);
        self.apply(state)
    }

    async fn remove_pass(&mut self, character_id: &str) -> Result<(), SessionError> {
        let state = actions::remove_pass(&self.store, character_id);
        self.apply(state)
    }

    async fn reset_passes(&mut self) -> Result<(), SessionError> {
        let state = actions::reset_passes(&self.store);
        self.apply(state)
    }

    async fn reset_all(&mut self) -> Result<(), SessionError> {
        let state = actions::reset_all(&self.store);
        self.apply(state)
    }

    async fn mark_match_read(&mut self, character_id: &str) -> Result<(), SessionError> {
        let state = actions::mark_match_read(&self.store, character_id);
        self.apply(state)
    }

    async fn set_preferences(&mut self, preferences: Preferences) -> Result<(), SessionError> {
        let state =
            actions::set_preferences(&self.store, preferences.genres, preferences.prefers_spicy);
        self.apply(state)
    }

    async fn set_current_character(
        &mut self,
        character_id: Option<&str>,
    ) -> Result<(), SessionError> {
        let state = actions::set_current_character(&self.store, character_id);
        self.apply(state)
    }

    async fn dismiss_signup_prompt(&mut self) -> Result<(), SessionError> {
        let state = actions::dismiss_signup_prompt(&self.store);
        self.apply(state)
    }

    async fn refresh(&mut self) -> Result<(), SessionError> {
        let state = self.store.init();
        self.apply(state)
    }
}

// ---------------------------------------------------------------------------
// ServerBackend
// ---------------------------------------------------------------------------

pub struct ServerBackend {
    data: Arc<dyn UserDataStore>,
    user_id: UserId,
    activity: UserActivity,
    /// The resume pointer is not persisted server-side.
    current_character_id: Option<CharacterId>,
}

impl ServerBackend {
    /// An empty cache for `user_id`; call [`refresh`](UserStateBackend::refresh)
    /// to load it.
    pub fn new(data: Arc<dyn UserDataStore>, user_id: UserId) -> Self {
        Self {
            data,
            user_id,
            activity: UserActivity::default(),
            current_character_id: None,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Treat duplicates as success; log anything else and hand it back.
    fn settle(
        &self,
        op: &'static str,
        result: Result<(), DataStoreError>,
    ) -> Result<(), SessionError> {
        ignore_duplicate(result).map_err(|e| {
            tracing::error!(user_id = %self.user_id, op, error = %e, "Failed to sync user state");
            SessionError::DataStore(e)
        })
    }
}

#[async_trait]
impl UserStateBackend for ServerBackend {
    fn snapshot(&self) -> UserSnapshot {
        UserSnapshot::authenticated(
            self.user_id,
            &self.activity,
            self.current_character_id.clone(),
        )
    }

    async fn add_match(
        &mut self,
        character_id: &str,
        next: Option<&str>,
    ) -> Result<(), SessionError> {
        self.current_character_id = next.map(str::to_string);
        if !self.activity.matches.iter().any(|m| m.character_id == character_id) {
            self.activity.matches.push(MatchRecord {
                character_id: character_id.to_string(),
                matched_at: Some(Utc::now()),
                is_read: false,
            });
        }

        let result = match self.data.insert_match(self.user_id, character_id).await {
            Ok(stored) => {
                if let Some(local) = self
                    .activity
                    .matches
                    .iter_mut()
                    .find(|m| m.character_id == character_id)
                {
                    local.matched_at = stored.matched_at;
                }
                Ok(())
            }
            Err(e) => Err(e),
        };
        self.settle("insert_match", result)
    }

    async fn add_pass(
        &mut self,
        character_id: &str,
        next: Option<&str>,
    ) -> Result<(), SessionError> {
        self.current_character_id = next.map(str::to_string);
        self.activity.passed_character_ids.insert(character_id.to_string());
        let result = self.data.insert_pass(self.user_id, character_id).await;
        self.settle("insert_pass", result)
    }

    async fn mark_book_read(&mut self, book_id: &str) -> Result<(), SessionError> {
        self.activity.read_book_ids.insert(book_id.to_string());
        let result = self.data.insert_read_book(self.user_id, book_id).await;
        self.settle("insert_read_book", result)
    }

    async fn unmark_book_read(&mut self, book_id: &str) -> Result<(), SessionError> {
        self.activity.read_book_ids.shift_remove(book_id);
        let result = self.data.delete_read_book(self.user_id, book_id).await;
        self.settle("delete_read_book", result)
    }

    async fn remove_match(&mut self, character_id: &str) -> Result<(), SessionError> {
        self.activity.matches.retain(|m| m.character_id != character_id);
        let result = self.data.delete_match(self.user_id, character_id).await;
        self.settle("delete_match", result)
    }

    async fn remove_pass(&mut self, character_id: &str) -> Result<(), SessionError> {
        self.activity.passed_character_ids.shift_remove(character_id);
        let result = self.data.delete_pass(self.user_id, character_id).await;
        self.settle("delete_pass", result)
    }

    async fn reset_passes(&mut self) -> Result<(), SessionError> {
        self.activity.passed_character_ids.clear();
        self.current_character_id = None;
        let result = self.data.delete_all_passes(self.user_id).await;
        self.settle("delete_all_passes", result)
    }

    async fn reset_all(&mut self) -> Result<(), SessionError> {
        self.activity.matches.clear();
        self.activity.passed_character_ids.clear();
        self.current_character_id = None;
        let matches = self.data.delete_all_matches(self.user_id).await;
        let passes = self.data.delete_all_passes(self.user_id).await;
        self.settle("delete_all_matches", matches)?;
        self.settle("delete_all_passes", passes)
    }

    async fn mark_match_read(&mut self, character_id: &str) -> Result<(), SessionError> {
        match self
            .activity
            .matches
            .iter_mut()
            .find(|m| m.character_id == character_id)
        {
            Some(m) if !m.is_read => m.is_read = true,
            _ => return Ok(()),
        }
        let result = self.data.mark_match_read(self.user_id, character_id).await;
        self.settle("mark_match_read", result)
    }

    async fn set_preferences(&mut self, preferences: Preferences) -> Result<(), SessionError> {
        self.activity.preferences = preferences;
        let result = self
            .data
            .save_preferences(self.user_id, &self.activity.preferences)
            .await;
        self.settle("save_preferences", result)
    }

    async fn set_current_character(
        &mut self,
        character_id: Option<&str>,
    ) -> Result<(), SessionError> {
        self.current_character_id = character_id.map(str::to_string);
        Ok(())
    }

    async fn dismiss_signup_prompt(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn refresh(&mut self) -> Result<(), SessionError> {
        match self.data.fetch_activity(self.user_id).await {
            Ok(activity) => {
                tracing::debug!(
                    user_id = %self.user_id,
                    matches = activity.matches.len(),
                    passes = activity.passed_character_ids.len(),
                    read_books = activity.read_book_ids.len(),
                    "Fetched user activity"
                );
                self.activity = activity;
                Ok(())
            }
            Err(e) => self.settle("fetch_activity", Err(e)),
        }
    }
}
