//! Repository for the `user_profiles` table.

use booklove_core::types::UserId;
use sqlx::PgPool;

use crate::models::user_profile::UserProfile;

/// Column list for `user_profiles` queries.
const COLUMNS: &str = "id, genre_preferences, prefers_spicy, is_admin, created_at, updated_at";

/// Provides access to user profiles and their swipe preferences.
pub struct UserProfileRepo;

impl UserProfileRepo {
    pub async fn find_by_id(
        pool: &PgPool,
        user_id: UserId,
    ) -> Result<Option<UserProfile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_profiles WHERE id = $1");
        sqlx::query_as::<_, UserProfile>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert or overwrite the genre/spice preferences for a user.
    ///
    /// Uses `INSERT ... ON CONFLICT (id) DO UPDATE` so the profile row is
    /// created on first write.
    pub async fn upsert_preferences(
        pool: &PgPool,
        user_id: UserId,
        genre_preferences: &[String],
        prefers_spicy: Option<bool>,
    ) -> Result<UserProfile, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_profiles (id, genre_preferences, prefers_spicy) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET \
                genre_preferences = EXCLUDED.genre_preferences, \
                prefers_spicy = EXCLUDED.prefers_spicy, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserProfile>(&query)
            .bind(user_id)
            .bind(genre_preferences)
            .bind(prefers_spicy)
            .fetch_one(pool)
            .await
    }

    /// Create an empty profile if none exists yet. Returns `true` if created.
    pub async fn ensure_exists(pool: &PgPool, user_id: UserId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO user_profiles (id) VALUES ($1) ON CONFLICT (id) DO NOTHING",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
