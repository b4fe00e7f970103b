//! Repository for the `user_passes` table.

use booklove_core::types::UserId;
use sqlx::PgPool;

use crate::models::user_pass::UserPass;

/// Column list for `user_passes` queries.
const COLUMNS: &str = "id, user_id, character_id, created_at, updated_at";

/// Provides CRUD operations for a user's passes.
pub struct UserPassRepo;

impl UserPassRepo {
    /// Insert a single pass. Duplicates fail with a unique violation.
    pub async fn create(
        pool: &PgPool,
        user_id: UserId,
        character_id: &str,
    ) -> Result<UserPass, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_passes (user_id, character_id) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserPass>(&query)
            .bind(user_id)
            .bind(character_id)
            .fetch_one(pool)
            .await
    }

    /// Insert many passes, skipping pairs that already exist.
    pub async fn insert_many_ignoring_conflicts(
        pool: &PgPool,
        user_id: UserId,
        character_ids: &[String],
    ) -> Result<u64, sqlx::Error> {
        if character_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "INSERT INTO user_passes (user_id, character_id) \
             SELECT $1, UNNEST($2::text[]) \
             ON CONFLICT (user_id, character_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(character_ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// List a user's passes, most recent first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: UserId,
    ) -> Result<Vec<UserPass>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_passes \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, UserPass>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn delete(
        pool: &PgPool,
        user_id: UserId,
        character_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM user_passes WHERE user_id = $1 AND character_id = $2",
        )
        .bind(user_id)
        .bind(character_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every pass for a user (used to let them re-see skipped characters).
    pub async fn delete_all_for_user(pool: &PgPool, user_id: UserId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_passes WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
