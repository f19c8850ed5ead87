//! Backfill error types

use thiserror::Error;

/// Errors that can occur while reading or patching users
#[derive(Error, Debug)]
pub enum BackfillError {
    /// SQLite operation failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested user does not exist
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// A stored timestamp could not be converted
    #[error("Invalid stored timestamp: {0}")]
    InvalidTimestamp(i64),

    /// Store rejected a write
    #[error("Store error: {0}")]
    Store(String),

    /// Patching a single user failed; users patched before it stay patched
    #[error("Failed to patch user {user_id}: {source}")]
    Patch {
        user_id: String,
        #[source]
        source: Box<BackfillError>,
    },

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

/// Result type alias for backfill operations
pub type BackfillResult<T> = Result<T, BackfillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BackfillError::UserNotFound("user_1".to_string());
        assert_eq!(err.to_string(), "User not found: user_1");

        let err = BackfillError::Patch {
            user_id: "user_2".to_string(),
            source: Box::new(BackfillError::Store("quota exceeded".to_string())),
        };
        assert_eq!(
            err.to_string(),
            "Failed to patch user user_2: Store error: quota exceeded"
        );
    }

    #[test]
    fn test_sqlite_error_conversion() {
        let err: BackfillError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, BackfillError::Database(_)));
    }
}
