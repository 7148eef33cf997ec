use thiserror::Error;

/// Database layer errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),

    #[error("Pool error: {0}")]
    PoolError(#[from] diesel_async::pooled_connection::bb8::RunError),

    #[error("Pool setup error: {0}")]
    PoolSetupError(#[from] diesel_async::pooled_connection::PoolError),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error(transparent)]
    CoreError(#[from] strongbox_core::error::CoreError),
}

impl DbError {
    /// Translates a diesel error, surfacing unique violations as their own variant.
    #[must_use]
    pub fn from_diesel(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match err {
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::UniqueViolation(info.message().to_string())
            }
            other => Self::DatabaseError(other),
        }
    }
}

pub type DbResult<T> = std::result::Result<T, DbError>;
