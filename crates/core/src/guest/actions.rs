//! Guest state transitions.
//!
//! Each action reads the current state through [`GuestStore::init`],
//! computes a [`GuestStatePatch`], and persists it with
//! [`GuestStore::update`]. Every action returns the resulting state, or
//! `None` when storage is unavailable, and applying an action twice leaves
//! the same sets as applying it once.

use indexmap::IndexSet;

use super::state::{GuestMatch, GuestState, GuestStatePatch};
use super::store::GuestStore;

/// Record a like. Existing matches are left untouched; only the resume
/// pointer advances.
pub fn record_match(
    store: &GuestStore,
    character_id: &str,
    next_character_id: Option<&str>,
) -> Option<GuestState> {
    let state = store.init()?;
    let next = Some(next_character_id.map(str::to_string));

    if state.is_matched(character_id) {
        return store.update(GuestStatePatch {
            current_character_id: next,
            ..Default::default()
        });
    }

    let mut matches = state.matches;
    matches.push(GuestMatch::new(character_id));
    store.update(GuestStatePatch {
        matches: Some(matches),
        current_character_id: next,
        ..Default::default()
    })
}

/// Record a skip. Passes carry no timestamp.
pub fn record_pass(
    store: &GuestStore,
    character_id: &str,
    next_character_id: Option<&str>,
) -> Option<GuestState> {
    let state = store.init()?;
    let next = Some(next_character_id.map(str::to_string));

    if state.passed_character_ids.contains(character_id) {
        return store.update(GuestStatePatch {
            current_character_id: next,
            ..Default::default()
        });
    }

    let mut passed = state.passed_character_ids;
    passed.insert(character_id.to_string());
    store.update(GuestStatePatch {
        passed_character_ids: Some(passed),
        current_character_id: next,
        ..Default::default()
    })
}

pub fn mark_book_read(store: &GuestStore, book_id: &str) -> Option<GuestState> {
    let state = store.init()?;
    if state.read_book_ids.contains(book_id) {
        return Some(state);
    }

    let mut read = state.read_book_ids;
    read.insert(book_id.to_string());
    store.update(GuestStatePatch {
        read_book_ids: Some(read),
        ..Default::default()
    })
}

pub fn unmark_book_read(store: &GuestStore, book_id: &str) -> Option<GuestState> {
    let mut read = store.init()?.read_book_ids;
    read.shift_remove(book_id);
    store.update(GuestStatePatch {
        read_book_ids: Some(read),
        ..Default::default()
    })
}

pub fn remove_match(store: &GuestStore, character_id: &str) -> Option<GuestState> {
    let mut matches = store.init()?.matches;
    matches.retain(|m| m.character_id != character_id);
    store.update(GuestStatePatch {
        matches: Some(matches),
        ..Default::default()
    })
}

pub fn remove_pass(store: &GuestStore, character_id: &str) -> Option<GuestState> {
    let mut passed = store.init()?.passed_character_ids;
    passed.shift_remove(character_id);
    store.update(GuestStatePatch {
        passed_character_ids: Some(passed),
        ..Default::default()
    })
}

/// Forget every pass so skipped characters come around again. Matches stay.
pub fn reset_passes(store: &GuestStore) -> Option<GuestState> {
    store.update(GuestStatePatch {
        passed_character_ids: Some(IndexSet::new()),
        current_character_id: Some(None),
        ..Default::default()
    })
}

/// Start over: matches, passes and the resume pointer are all cleared.
pub fn reset_all(store: &GuestStore) -> Option<GuestState> {
    store.update(GuestStatePatch {
        matches: Some(Vec::new()),
        passed_character_ids: Some(IndexSet::new()),
        current_character_id: Some(None),
        ..Default::default()
    })
}

/// Flag a match as seen. No write when the match is absent or already read.
pub fn mark_match_read(store: &GuestStore, character_id: &str) -> Option<GuestState> {
    let state = store.init()?;
    match state.find_match(character_id) {
        Some(m) if !m.is_read => {}
        _ => return Some(state),
    }

    let matches = state
        .matches
        .into_iter()
        .map(|mut m| {
            if m.character_id == character_id {
                m.is_read = true;
            }
            m
        })
        .collect();
    store.update(GuestStatePatch {
        matches: Some(matches),
        ..Default::default()
    })
}

pub fn dismiss_signup_prompt(store: &GuestStore) -> Option<GuestState> {
    store.update(GuestStatePatch {
        signup_prompt_dismissed: Some(true),
        ..Default::default()
    })
}

pub fn set_preferences(
    store: &GuestStore,
    genres: IndexSet<String>,
    prefers_spicy: Option<bool>,
) -> Option<GuestState> {
    store.update(GuestStatePatch {
        genre_preferences: Some(genres),
        prefers_spicy: Some(prefers_spicy),
        ..Default::default()
    })
}

/// Move the resume pointer without recording a swipe.
pub fn set_current_character(
    store: &GuestStore,
    character_id: Option<&str>,
) -> Option<GuestState> {
    store.update(GuestStatePatch {
        current_character_id: Some(character_id.map(str::to_string)),
        ..Default::default()
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
