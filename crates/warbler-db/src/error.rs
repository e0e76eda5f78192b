use rusqlite::ErrorCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

/// Rejections raised while building a record, before anything touches SQLite.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Password must not be empty.")]
    EmptyPassword,
}

#[derive(Debug, Error)]
pub enum DbError {
    /// A UNIQUE, NOT NULL, CHECK or foreign-key constraint rejected the write.
    #[error("integrity error: {0}")]
    Integrity(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("database lock poisoned")]
    LockPoisoned,
}

impl DbError {
    pub fn is_integrity(&self) -> bool {
        matches!(self, DbError::Integrity(_))
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, msg)
                if code.code == ErrorCode::ConstraintViolation =>
            {
                DbError::Integrity(msg.unwrap_or_else(|| code.to_string()))
            }
            other => DbError::Sqlite(other),
        }
    }
}
