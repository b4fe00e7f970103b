//! Repository for the `user_matches` table.

use booklove_core::types::UserId;
use sqlx::PgPool;

use crate::models::user_match::{NewUserMatch, UserMatch};

/// Column list for `user_matches` queries.
const COLUMNS: &str = "id, user_id, character_id, is_read, created_at, updated_at";

/// Provides CRUD operations for a user's matches.
pub struct UserMatchRepo;

impl UserMatchRepo {
    /// Insert a single match.
    ///
    /// Fails with a unique violation (SQLSTATE 23505) if the user already
    /// matched this character; see [`crate::is_unique_violation`].
    pub async fn create(
        pool: &PgPool,
        user_id: UserId,
        character_id: &str,
    ) -> Result<UserMatch, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_matches (user_id, character_id) \
             VALUES ($1, $2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserMatch>(&query)
            .bind(user_id)
            .bind(character_id)
            .fetch_one(pool)
            .await
    }

    /// Insert many matches in one statement, skipping pairs that already
    /// exist. Returns the number of rows actually inserted.
    pub async fn insert_many_ignoring_conflicts(
        pool: &PgPool,
        user_id: UserId,
        matches: &[NewUserMatch],
    ) -> Result<u64, sqlx::Error> {
        if matches.is_empty() {
            return Ok(0);
        }

        let character_ids: Vec<String> = matches.iter().map(|m| m.character_id.clone()).collect();
        let is_read: Vec<bool> = matches.iter().map(|m| m.is_read).collect();
        let matched_at: Vec<Option<_>> = matches.iter().map(|m| m.matched_at).collect();

        let result = sqlx::query(
            "INSERT INTO user_matches (user_id, character_id, is_read, created_at) \
             SELECT $1, t.character_id, t.is_read, COALESCE(t.matched_at, NOW()) \
             FROM UNNEST($2::text[], $3::bool[], $4::timestamptz[]) \
                 AS t(character_id, is_read, matched_at) \
             ON CONFLICT (user_id, character_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(&character_ids)
        .bind(&is_read)
        .bind(&matched_at)
        .execute(pool)
        .await?;

        tracing::debug!(
            %user_id,
            requested = matches.len(),
            inserted = result.rows_affected(),
            "Bulk-inserted user matches"
        );
        Ok(result.rows_affected())
    }

    /// List a user's matches, most recent first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: UserId,
    ) -> Result<Vec<UserMatch>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_matches \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, UserMatch>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Flag a match as seen. Returns `true` if the row changed.
    pub async fn mark_read(
        pool: &PgPool,
        user_id: UserId,
        character_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE user_matches SET is_read = true, updated_at = NOW() \
             WHERE user_id = $1 AND character_id = $2 AND is_read = false",
        )
        .bind(user_id)
        .bind(character_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete one match. Returns `true` if a row was removed.
    pub async fn delete(
        pool: &PgPool,
        user_id: UserId,
        character_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM user_matches WHERE user_id = $1 AND character_id = $2",
        )
        .bind(user_id)
        .bind(character_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every match for a user.
    pub async fn delete_all_for_user(pool: &PgPool, user_id: UserId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM user_matches WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
