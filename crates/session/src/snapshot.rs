//! Read-only view of a visitor's state, published after every operation.

use booklove_core::guest::{sort_by_recency, GuestState, SIGNUP_PROMPT_THRESHOLD};
use booklove_core::types::{BookId, CharacterId, UserId};
use indexmap::IndexSet;
use serde::Serialize;

use crate::data_store::{MatchRecord, Preferences, UserActivity};

/// The signup/login event handed over by the auth provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthSession {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SessionMode {
    /// `visitor_id` is `None` when client-local storage is unusable.
    Guest { visitor_id: Option<String> },
    Authenticated { user_id: UserId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSnapshot {
    pub mode: SessionMode,
    /// True when no guest state existed before this session started.
    pub is_new_visitor: bool,
    /// Insertion order, oldest first.
    pub matches: Vec<MatchRecord>,
    pub passed_character_ids: IndexSet<CharacterId>,
    pub read_book_ids: IndexSet<BookId>,
    pub preferences: Preferences,
    pub current_character_id: Option<CharacterId>,
    pub signup_prompt_dismissed: bool,
}

impl UserSnapshot {
    /// Snapshot of a guest, or of a guest without usable storage.
    pub fn guest(state: Option<&GuestState>, is_new_visitor: bool) -> Self {
        let Some(state) = state else {
            return Self {
                mode: SessionMode::Guest { visitor_id: None },
                is_new_visitor,
                matches: Vec::new(),
                passed_character_ids: IndexSet::new(),
                read_book_ids: IndexSet::new(),
                preferences: Preferences::default(),
                current_character_id: None,
                signup_prompt_dismissed: false,
            };
        };

        Self {
            mode: SessionMode::Guest {
                visitor_id: Some(state.visitor_id.clone()),
            },
            is_new_visitor,
            matches: state.matches.iter().cloned().map(MatchRecord::from).collect(),
            passed_character_ids: state.passed_character_ids.clone(),
            read_book_ids: state.read_book_ids.clone(),
            preferences: Preferences {
                genres: state.genre_preferences.clone(),
                prefers_spicy: state.prefers_spicy,
            },
            current_character_id: state.current_character_id.clone(),
            signup_prompt_dismissed: state.signup_prompt_dismissed,
        }
    }

    pub fn authenticated(
        user_id: UserId,
        activity: &UserActivity,
        current_character_id: Option<CharacterId>,
    ) -> Self {
        Self {
            mode: SessionMode::Authenticated { user_id },
            is_new_visitor: false,
            matches: activity.matches.clone(),
            passed_character_ids: activity.passed_character_ids.clone(),
            read_book_ids: activity.read_book_ids.clone(),
            preferences: activity.preferences.clone(),
            current_character_id,
            signup_prompt_dismissed: false,
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self.mode, SessionMode::Guest { .. })
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self.mode {
            SessionMode::Authenticated { user_id } => Some(user_id),
            SessionMode::Guest { .. } => None,
        }
    }

    pub fn matched_character_ids(&self) -> Vec<CharacterId> {
        self.matches.iter().map(|m| m.character_id.clone()).collect()
    }

    pub fn has_unread_matches(&self) -> bool {
        self.matches.iter().any(|m| !m.is_read)
    }

    pub fn genre_preferences(&self) -> &IndexSet<String> {
        &self.preferences.genres
    }

    pub fn prefers_spicy(&self) -> Option<bool> {
        self.preferences.prefers_spicy
    }

    /// Guests only: true exactly at the signup threshold, until dismissed.
    pub fn should_show_signup_prompt(&self) -> bool {
        self.is_guest()
            && self.matches.len() == SIGNUP_PROMPT_THRESHOLD
            && !self.signup_prompt_dismissed
    }

    /// Matched or passed characters, which the discover feed skips.
    pub fn excluded_character_ids(&self) -> IndexSet<CharacterId> {
        self.matches
            .iter()
            .map(|m| m.character_id.clone())
            .chain(self.passed_character_ids.iter().cloned())
            .collect()
    }

    pub fn matches_by_recency(&self) -> Vec<MatchRecord> {
        sort_by_recency(self.matches.clone(), |m| m.matched_at)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
