//! User match entity model.

use booklove_core::types::{Timestamp, UserId};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `user_matches` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserMatch {
    pub id: i64,
    pub user_id: UserId,
    pub character_id: String,
    pub is_read: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A match to bulk-insert, e.g. when carrying guest activity over on signup.
#[derive(Debug, Clone)]
pub struct NewUserMatch {
    pub character_id: String,
    pub is_read: bool,
    /// Becomes `created_at`; `None` uses the insert time.
    pub matched_at: Option<Timestamp>,
}
