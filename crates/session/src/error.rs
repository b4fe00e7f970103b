use booklove_core::error::CoreError;

use crate::migration::MigrationError;

/// Errors raised by a [`UserDataStore`](crate::UserDataStore).
#[derive(Debug, thiserror::Error)]
pub enum DataStoreError {
    /// The row already exists. Callers treat this as success.
    #[error("Row already exists")]
    Duplicate,

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Data store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for DataStoreError {
    fn from(err: sqlx::Error) -> Self {
        if booklove_db::is_unique_violation(&err) {
            DataStoreError::Duplicate
        } else {
            DataStoreError::Database(err)
        }
    }
}

/// Errors returned by [`UserState`](crate::UserState) operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    DataStore(#[from] DataStoreError),

    #[error(transparent)]
    Migration(#[from] MigrationError),
}

/// Map a duplicate-row error to success.
pub(crate) fn ignore_duplicate(result: Result<(), DataStoreError>) -> Result<(), DataStoreError> {
    match result {
        Err(DataStoreError::Duplicate) => Ok(()),
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn non_unique_sqlx_errors_stay_database_errors() {
        let err: DataStoreError = sqlx::Error::RowNotFound.into();
        assert_matches!(err, DataStoreError::Database(sqlx::Error::RowNotFound));
    }

    #[test]
    fn duplicates_are_swallowed() {
        assert!(ignore_duplicate(Err(DataStoreError::Duplicate)).is_ok());
        assert_matches!(
            ignore_duplicate(Err(DataStoreError::Unavailable("down".into()))),
            Err(DataStoreError::Unavailable(_))
        );
    }

    #[test]
    fn validation_errors_pass_through() {
        let err: SessionError = CoreError::Validation("Character ID is empty".into()).into();
        assert_eq!(err.to_string(), "Validation failed: Character ID is empty");
    }
}
