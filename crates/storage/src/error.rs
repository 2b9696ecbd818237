use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("core error: {0}")]
    Core(#[from] wellops_core::CoreError),
}

impl StorageError {
    /// Map a SQLite constraint failure to `ConstraintViolation`, keeping the
    /// statement context; other errors pass through unchanged.
    pub(crate) fn from_write(err: rusqlite::Error, context: &str) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, msg)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                let detail = msg.unwrap_or_else(|| e.to_string());
                StorageError::ConstraintViolation(format!("{context}: {detail}"))
            }
            other => StorageError::Sqlite(other),
        }
    }
}
