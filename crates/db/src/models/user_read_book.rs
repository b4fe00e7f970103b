use booklove_core::types::{Timestamp, UserId};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `user_read_books` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserReadBook {
    pub id: i64,
    pub user_id: UserId,
    pub book_id: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
