//! User profile entity model.

use booklove_core::types::{Timestamp, UserId};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `user_profiles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub genre_preferences: Vec<String>,
    /// `None` means no preference.
    pub prefers_spicy: Option<bool>,
    pub is_admin: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
