//! [`UserDataStore`] on PostgreSQL through the `booklove-db` repositories.

use async_trait::async_trait;
use booklove_core::types::{BookId, CharacterId, UserId};
use booklove_db::models::user_match::NewUserMatch;
use booklove_db::repositories::{UserMatchRepo, UserPassRepo, UserProfileRepo, UserReadBookRepo};
use booklove_db::DbPool;

use crate::data_store::{MatchRecord, Preferences, UserActivity, UserDataStore};
use crate::error::DataStoreError;

#[derive(Clone)]
pub struct PgUserDataStore {
    pool: DbPool,
}

impl PgUserDataStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl UserDataStore for PgUserDataStore {
    async fn fetch_activity(&self, user_id: UserId) -> Result<UserActivity, DataStoreError> {
        if UserProfileRepo::ensure_exists(&self.pool, user_id).await? {
            tracing::info!(%user_id, "Created empty user profile");
        }

        let (matches, passes, read_books, profile) = tokio::try_join!(
            UserMatchRepo::list_for_user(&self.pool, user_id),
            UserPassRepo::list_for_user(&self.pool, user_id),
            UserReadBookRepo::list_for_user(&self.pool, user_id),
            UserProfileRepo::find_by_id(&self.pool, user_id),
        )?;

        let preferences = profile
            .map(|p| Preferences {
                genres: p.genre_preferences.into_iter().collect(),
                prefers_spicy: p.prefers_spicy,
            })
            .unwrap_or_default();

        // Repositories list newest first; activity is kept oldest first.
        Ok(UserActivity {
            matches: matches.into_iter().rev().map(MatchRecord::from).collect(),
            passed_character_ids: passes.into_iter().rev().map(|p| p.character_id).collect(),
            read_book_ids: read_books.into_iter().rev().map(|b| b.book_id).collect(),
            preferences,
        })
    }

    async fn insert_match(
        &self,
        user_id: UserId,
        character_id: &str,
    ) -> Result<MatchRecord, DataStoreError> {
        let row = UserMatchRepo::create(&self.pool, user_id, character_id).await?;
        Ok(row.into())
    }

    async fn mark_match_read(
        &self,
        user_id: UserId,
        character_id: &str,
    ) -> Result<(), DataStoreError> {
        UserMatchRepo::mark_read(&self.pool, user_id, character_id).await?;
        Ok(())
    }

    async fn delete_match(&self, user_id: UserId, character_id: &str) -> Result<(), DataStoreError> {
        UserMatchRepo::delete(&self.pool, user_id, character_id).await?;
        Ok(())
    }

    async fn delete_all_matches(&self, user_id: UserId) -> Result<(), DataStoreError> {
        let deleted = UserMatchRepo::delete_all_for_user(&self.pool, user_id).await?;
        tracing::debug!(%user_id, deleted, "Deleted all user matches");
        Ok(())
    }

    async fn insert_pass(&self, user_id: UserId, character_id: &str) -> Result<(), DataStoreError> {
        UserPassRepo::create(&self.pool, user_id, character_id).await?;
        Ok(())
    }

    async fn delete_pass(&self, user_id: UserId, character_id: &str) -> Result<(), DataStoreError> {
        UserPassRepo::delete(&self.pool, user_id, character_id).await?;
        Ok(())
    }

    async fn delete_all_passes(&self, user_id: UserId) -> Result<(), DataStoreError> {
        let deleted = UserPassRepo::delete_all_for_user(&self.pool, user_id).await?;
        tracing::debug!(%user_id, deleted, "Deleted all user passes");
        Ok(())
    }

    async fn insert_read_book(&self, user_id: UserId, book_id: &str) -> Result<(), DataStoreError> {
        UserReadBookRepo::create(&self.pool, user_id, book_id).await?;
        Ok(())
    }

    async fn delete_read_book(&self, user_id: UserId, book_id: &str) -> Result<(), DataStoreError> {
        UserReadBookRepo::delete(&self.pool, user_id, book_id).await?;
        Ok(())
    }

    async fn save_preferences(
        &self,
        user_id: UserId,
        preferences: &Preferences,
    ) -> Result<(), DataStoreError> {
        let genres: Vec<String> = preferences.genres.iter().cloned().collect();
        UserProfileRepo::upsert_preferences(&self.pool, user_id, &genres, preferences.prefers_spicy)
            .await?;
        Ok(())
    }

    async fn insert_matches_ignoring_conflicts(
        &self,
        user_id: UserId,
        matches: &[MatchRecord],
    ) -> Result<u64, DataStoreError> {
        let rows: Vec<NewUserMatch> = matches.iter().map(NewUserMatch::from).collect();
        Ok(UserMatchRepo::insert_many_ignoring_conflicts(&self.pool, user_id, &rows).await?)
    }

    async fn insert_passes_ignoring_conflicts(
        &self,
        user_id: UserId,
        character_ids: &[CharacterId],
    ) -> Result<u64, DataStoreError> {
        Ok(UserPassRepo::insert_many_ignoring_conflicts(&self.pool, user_id, character_ids).await?)
    }

    async fn insert_read_books_ignoring_conflicts(
        &self,
        user_id: UserId,
        book_ids: &[BookId],
    ) -> Result<u64, DataStoreError> {
        Ok(UserReadBookRepo::insert_many_ignoring_conflicts(&self.pool, user_id, book_ids).await?)
    }
}
