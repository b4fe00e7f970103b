//! The current (v2) guest state shape and its derived views.

use chrono::Utc;
use indexmap::IndexSet;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{BookId, CharacterId, Timestamp};

use super::SIGNUP_PROMPT_THRESHOLD;

// ---------------------------------------------------------------------------
// GuestMatch
// ---------------------------------------------------------------------------

/// A character the guest has liked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestMatch {
    pub character_id: CharacterId,
    /// `None` for matches upgraded from the legacy flat id list.
    #[serde(default)]
    pub matched_at: Option<Timestamp>,
    #[serde(default)]
    pub is_read: bool,
}

impl GuestMatch {
    /// A brand-new, unread match stamped with the current time.
    pub fn new(character_id: impl Into<CharacterId>) -> Self {
        Self {
            character_id: character_id.into(),
            matched_at: Some(Utc::now()),
            is_read: false,
        }
    }

    /// A match carried over from the legacy schema: time unknown, already seen.
    pub fn legacy(character_id: impl Into<CharacterId>) -> Self {
        Self {
            character_id: character_id.into(),
            matched_at: None,
            is_read: true,
        }
    }
}

// ---------------------------------------------------------------------------
// GuestState
// ---------------------------------------------------------------------------

/// Everything an anonymous visitor has accumulated, as persisted in the
/// client-local slot.
///
/// `matches`, `visitorId` and `passedCharacterIds` are required on load. The
/// remaining fields fall back to their defaults when missing or malformed, so
/// a stray `null` never costs the visitor their matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestState {
    pub visitor_id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub genre_preferences: IndexSet<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub prefers_spicy: Option<bool>,
    pub matches: Vec<GuestMatch>,
    pub passed_character_ids: IndexSet<CharacterId>,
    #[serde(default, deserialize_with = "lenient")]
    pub read_book_ids: IndexSet<BookId>,
    #[serde(default, deserialize_with = "lenient")]
    pub current_character_id: Option<CharacterId>,
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub last_visit: Timestamp,
    #[serde(default, deserialize_with = "lenient")]
    pub signup_prompt_dismissed: bool,
}

impl GuestState {
    /// Fresh state for a first-time visitor.
    pub fn new(visitor_id: impl Into<String>) -> Self {
        Self {
            visitor_id: visitor_id.into(),
            genre_preferences: IndexSet::new(),
            prefers_spicy: None,
            matches: Vec::new(),
            passed_character_ids: IndexSet::new(),
            read_book_ids: IndexSet::new(),
            current_character_id: None,
            last_visit: Utc::now(),
            signup_prompt_dismissed: false,
        }
    }

    /// Fresh state with a newly generated visitor id.
    pub fn with_random_visitor() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    pub fn find_match(&self, character_id: &str) -> Option<&GuestMatch> {
        self.matches.iter().find(|m| m.character_id == character_id)
    }

    pub fn is_matched(&self, character_id: &str) -> bool {
        self.find_match(character_id).is_some()
    }

    /// Matched character ids in insertion order.
    pub fn matched_character_ids(&self) -> Vec<CharacterId> {
        self.matches.iter().map(|m| m.character_id.clone()).collect()
    }

    pub fn has_unread_matches(&self) -> bool {
        self.matches.iter().any(|m| !m.is_read)
    }

    /// True exactly when the guest sits at the signup threshold and has not
    /// dismissed the prompt.
    pub fn should_show_signup_prompt(&self) -> bool {
        self.matches.len() == SIGNUP_PROMPT_THRESHOLD && !self.signup_prompt_dismissed
    }

    /// Characters that should not be dealt again: matched or passed.
    pub fn excluded_character_ids(&self) -> IndexSet<CharacterId> {
        self.matches
            .iter()
            .map(|m| m.character_id.clone())
            .chain(self.passed_character_ids.iter().cloned())
            .collect()
    }

    /// Matches ordered most recent first; legacy entries without a timestamp
    /// keep their relative order at the end.
    pub fn matches_by_recency(&self) -> Vec<GuestMatch> {
        sort_by_recency(self.matches.clone(), |m| m.matched_at)
    }

    /// Summary used to greet a returning visitor.
    pub fn return_visit(&self) -> ReturnVisit {
        ReturnVisit {
            is_returning: true,
            has_data: !self.matches.is_empty() || !self.passed_character_ids.is_empty(),
            can_resume: self.current_character_id.is_some(),
        }
    }
}

/// Sort items most recent first, with `None` timestamps last. The sort is
/// stable so untimed entries keep their insertion order.
pub fn sort_by_recency<T>(
    mut items: Vec<T>,
    matched_at: impl Fn(&T) -> Option<Timestamp>,
) -> Vec<T> {
    items.sort_by(|a, b| match (matched_at(a), matched_at(b)) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    items
}

/// Decode an optional field, substituting the default for any value of the
/// wrong shape.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Like [`lenient`], but an unparseable timestamp becomes "now".
pub(crate) fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(Timestamp::deserialize(value).unwrap_or_else(|_| Utc::now()))
}

/// What the store knows about a visitor before creating any state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReturnVisit {
    pub is_returning: bool,
    pub has_data: bool,
    pub can_resume: bool,
}

// ---------------------------------------------------------------------------
// GuestStatePatch
// ---------------------------------------------------------------------------

/// A partial update merged into the current state by
/// [`GuestStore::update`](super::GuestStore::update).
///
/// Fields left as `None` are untouched. Nullable fields use a nested
/// `Option` so callers can distinguish "leave alone" from "set to null".
#[derive(Debug, Clone, Default)]
pub struct GuestStatePatch {
    pub genre_preferences: Option<IndexSet<String>>,
    pub prefers_spicy: Option<Option<bool>>,
    pub matches: Option<Vec<GuestMatch>>,
    pub passed_character_ids: Option<IndexSet<CharacterId>>,
    pub read_book_ids: Option<IndexSet<BookId>>,
    pub current_character_id: Option<Option<CharacterId>>,
    pub signup_prompt_dismissed: Option<bool>,
}

impl GuestStatePatch {
    /// Merge into `state`. The dismissed flag never reverts to `false`.
    pub fn apply(self, state: &mut GuestState) {
        if let Some(genres) = self.genre_preferences {
            state.genre_preferences = genres;
        }
        if let Some(prefers_spicy) = self.prefers_spicy {
            state.prefers_spicy = prefers_spicy;
        }
        if let Some(matches) = self.matches {
            state.matches = matches;
        }
        if let Some(passed) = self.passed_character_ids {
            state.passed_character_ids = passed;
        }
        if let Some(read) = self.read_book_ids {
            state.read_book_ids = read;
        }
        if let Some(current) = self.current_character_id {
            state.current_character_id = current;
        }
        if let Some(dismissed) = self.signup_prompt_dismissed {
            state.signup_prompt_dismissed = state.signup_prompt_dismissed || dismissed;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn state_with_matches(ids: &[&str]) -> GuestState {
        let mut state = GuestState::new("visitor");
        state.matches = ids.iter().map(|id| GuestMatch::new(*id)).collect();
        state
    }

    #[test]
    fn new_state_is_empty() {
        let state = GuestState::new("v-1");
        assert_eq!(state.visitor_id, "v-1");
        assert!(state.matches.is_empty());
        assert!(state.passed_character_ids.is_empty());
        assert!(!state.signup_prompt_dismissed);
        assert_eq!(state.prefers_spicy, None);
    }

    #[test]
    fn random_visitor_ids_differ() {
        let a = GuestState::with_random_visitor();
        let b = GuestState::with_random_visitor();
        assert_ne!(a.visitor_id, b.visitor_id);
    }

    #[test]
    fn unread_tracking() {
        let mut state = state_with_matches(&["a"]);
        assert!(state.has_unread_matches());
        state.matches[0].is_read = true;
        assert!(!state.has_unread_matches());
    }

    #[test]
    fn signup_prompt_only_at_threshold() {
        assert!(!state_with_matches(&["a", "b"]).should_show_signup_prompt());
        assert!(state_with_matches(&["a", "b", "c"]).should_show_signup_prompt());
        assert!(!state_with_matches(&["a", "b", "c", "d"]).should_show_signup_prompt());

        let mut dismissed = state_with_matches(&["a", "b", "c"]);
        dismissed.signup_prompt_dismissed = true;
        assert!(!dismissed.should_show_signup_prompt());
    }

    #[test]
    fn excluded_ids_union_matches_and_passes() {
        let mut state = state_with_matches(&["a", "b"]);
        state.passed_character_ids.insert("c".to_string());
        state.passed_character_ids.insert("a".to_string());
        let excluded: Vec<_> = state.excluded_character_ids().into_iter().collect();
        assert_eq!(excluded, vec!["a", "b", "c"]);
    }

    #[test]
    fn recency_puts_untimed_last() {
        let now = Utc::now();
        let mut state = GuestState::new("v");
        state.matches = vec![
            GuestMatch::legacy("old-1"),
            GuestMatch {
                character_id: "earlier".into(),
                matched_at: Some(now - Duration::minutes(5)),
                is_read: false,
            },
            GuestMatch::legacy("old-2"),
            GuestMatch {
                character_id: "latest".into(),
                matched_at: Some(now),
                is_read: false,
            },
        ];

        let ids: Vec<_> = state
            .matches_by_recency()
            .into_iter()
            .map(|m| m.character_id)
            .collect();
        assert_eq!(ids, vec!["latest", "earlier", "old-1", "old-2"]);
    }

    #[test]
    fn return_visit_flags() {
        let mut state = GuestState::new("v");
        assert_eq!(
            state.return_visit(),
            ReturnVisit {
                is_returning: true,
                has_data: false,
                can_resume: false
            }
        );

        state.passed_character_ids.insert("x".into());
        state.current_character_id = Some("y".into());
        let visit = state.return_visit();
        assert!(visit.has_data);
        assert!(visit.can_resume);
    }

    #[test]
    fn patch_leaves_unset_fields_alone() {
        let mut state = state_with_matches(&["a"]);
        state.current_character_id = Some("next".into());

        GuestStatePatch {
            prefers_spicy: Some(Some(true)),
            ..Default::default()
        }
        .apply(&mut state);

        assert_eq!(state.prefers_spicy, Some(true));
        assert_eq!(state.matches.len(), 1);
        assert_eq!(state.current_character_id.as_deref(), Some("next"));
    }

    #[test]
    fn patch_can_null_out_nullable_fields() {
        let mut state = GuestState::new("v");
        state.current_character_id = Some("c".into());
        state.prefers_spicy = Some(false);

        GuestStatePatch {
            current_character_id: Some(None),
            prefers_spicy: Some(None),
            ..Default::default()
        }
        .apply(&mut state);

        assert_eq!(state.current_character_id, None);
        assert_eq!(state.prefers_spicy, None);
    }

    #[test]
    fn dismissed_flag_never_reverts() {
        let mut state = GuestState::new("v");
        state.signup_prompt_dismissed = true;
        GuestStatePatch {
            signup_prompt_dismissed: Some(false),
            ..Default::default()
        }
        .apply(&mut state);
        assert!(state.signup_prompt_dismissed);
    }

    #[test]
    fn malformed_optional_fields_fall_back_to_defaults() {
        let before = Utc::now();
        let json = serde_json::json!({
            "visitorId": "v",
            "genrePreferences": "romance",
            "prefersSpicy": "yes",
            "matches": [{ "characterId": "a", "matchedAt": null, "isRead": true }],
            "passedCharacterIds": ["b"],
            "readBookIds": null,
            "currentCharacterId": 7,
            "lastVisit": "Sat Jun 01 2024",
            "signupPromptDismissed": null,
        });

        let state: GuestState = serde_json::from_value(json).unwrap();
        assert_eq!(state.matched_character_ids(), vec!["a"]);
        assert!(state.passed_character_ids.contains("b"));
        assert!(state.genre_preferences.is_empty());
        assert_eq!(state.prefers_spicy, None);
        assert!(state.read_book_ids.is_empty());
        assert_eq!(state.current_character_id, None);
        assert!(!state.signup_prompt_dismissed);
        assert!(state.last_visit >= before);
    }

    #[test]
    fn well_formed_last_visit_is_kept() {
        let json = serde_json::json!({
            "visitorId": "v",
            "matches": [],
            "passedCharacterIds": [],
            "lastVisit": "2024-06-01T12:00:00Z",
        });
        let state: GuestState = serde_json::from_value(json).unwrap();
        assert_eq!(state.last_visit.to_rfc3339(), "2024-06-01T12:00:00+00:00");
    }

    #[test]
    fn serializes_camel_case_without_legacy_field() {
        let state = state_with_matches(&["a"]);
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("visitorId").is_some());
        assert!(json.get("passedCharacterIds").is_some());
        assert!(json["matches"][0].get("isRead").is_some());
        assert!(json.get("matchedCharacterIds").is_none());
    }
}
