//! Repository for the `user_read_books` table.

use booklove_core::types::UserId;
use sqlx::PgPool;

use crate::models::user_read_book::UserReadBook;

/// Column list for `user_read_books` queries.
const COLUMNS: &str = "id, user_id, book_id, created_at, updated_at";

/// Provides CRUD operations for the books a user has marked as read.
pub struct UserReadBookRepo;

impl UserReadBookRepo {
    /// Insert a single read-book row. Duplicates fail with a unique violation.
    pub async fn create(
        pool: &PgPool,
        user_id: UserId,
        book_id: &str,
    ) -> Result<UserReadBook, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_read_books (user_id, book_id) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserReadBook>(&query)
            .bind(user_id)
            .bind(book_id)
            .fetch_one(pool)
            .await
    }

    /// Insert many read-book rows, skipping pairs that already exist.
    pub async fn insert_many_ignoring_conflicts(
        pool: &PgPool,
        user_id: UserId,
        book_ids: &[String],
    ) -> Result<u64, sqlx::Error> {
        if book_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "INSERT INTO user_read_books (user_id, book_id) \
             SELECT $1, UNNEST($2::text[]) \
             ON CONFLICT (user_id, book_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(book_ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// List a user's read books, most recent first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: UserId,
    ) -> Result<Vec<UserReadBook>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_read_books \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, UserReadBook>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, user_id: UserId, book_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_read_books WHERE user_id = $1 AND book_id = $2")
            .bind(user_id)
            .bind(book_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
