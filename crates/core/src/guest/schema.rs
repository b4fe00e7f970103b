//! Persisted guest-state schema history.
//!
//! The slot carries no explicit version tag; the version is recovered from
//! the blob's shape. [`GuestSchema`] names every shape ever written so that
//! [`GuestSchema::upgrade`] has to handle each of them.
//!
//! | Version | Distinguishing field                          |
//! |---------|-----------------------------------------------|
//! | v1      | flat `matchedCharacterIds: string[]`          |
//! | v2      | `matches: { characterId, matchedAt, isRead }[]` |

use chrono::Utc;
use indexmap::IndexSet;
use serde::Deserialize;

use crate::types::{BookId, CharacterId, Timestamp};

use super::state::{lenient, lenient_timestamp, GuestMatch, GuestState};

/// Why a persisted blob was rejected.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Guest state is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Guest state does not match any known schema: {0}")]
    UnknownShape(#[source] serde_json::Error),
}

/// The legacy shape: matches were a flat list of character ids.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestStateV1 {
    pub visitor_id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub genre_preferences: IndexSet<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub prefers_spicy: Option<bool>,
    pub matched_character_ids: Vec<CharacterId>,
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

/// Every persisted shape the store may encounter.
///
/// Variant order matters for decoding: a blob carrying both `matches` and a
/// stale `matchedCharacterIds` is already current.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum GuestSchema {
    V2(GuestState),
    V1(GuestStateV1),
}

impl GuestSchema {
    /// Decode a raw slot value.
    pub fn decode(raw: &str) -> Result<Self, SchemaError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(SchemaError::InvalidJson)?;
        serde_json::from_value(value).map_err(SchemaError::UnknownShape)
    }

    /// Whether this shape must be rewritten to reach the current one.
    pub fn is_current(&self) -> bool {
        matches!(self, Self::V2(_))
    }

    /// Convert to the current shape.
    pub fn upgrade(self) -> GuestState {
        match self {
            Self::V2(state) => state,
            Self::V1(legacy) => legacy.upgrade(),
        }
    }
}

impl GuestStateV1 {
    /// Each legacy id becomes a read match with an unknown timestamp; they
    /// predate read tracking. Duplicate ids collapse to their first position.
    pub fn upgrade(self) -> GuestState {
        let mut seen = IndexSet::new();
        let matches = self
            .matched_character_ids
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .map(GuestMatch::legacy)
            .collect();

        GuestState {
            visitor_id: self.visitor_id,
            genre_preferences: self.genre_preferences,
            prefers_spicy: self.prefers_spicy,
            matches,
            passed_character_ids: self.passed_character_ids,
            read_book_ids: self.read_book_ids,
            current_character_id: self.current_character_id,
            last_visit: self.last_visit,
            signup_prompt_dismissed: self.signup_prompt_dismissed,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
