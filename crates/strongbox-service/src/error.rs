use thiserror::Error;

use strongbox_db::error::DbError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Weak credentials: {0}")]
    WeakCredentials(String),

    #[error("Registration is closed")]
    RegistrationClosed,

    #[error("Setup already completed")]
    SetupComplete,

    #[error("Unknown user")]
    UnknownUser,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Store(#[from] DbError),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    #[error("Unauthorized")]
    Unauthorized,
}

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Vault entry not found")]
    NotFound,

    #[error("Vault path is forbidden")]
    Forbidden,

    #[error("Directory is not empty")]
    DirectoryNotEmpty,

    #[error("A path component is not a directory")]
    NotADirectory,

    #[error("Target is a directory")]
    IsADirectory,

    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Missing filename")]
    MissingFilename,

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("Write failed: {0}")]
    WriteFailed(std::io::Error),
}

#[derive(Error, Debug)]
pub enum ShareError {
    #[error("Share not found")]
    NotFound,

    #[error("Share is forbidden")]
    Forbidden,

    #[error(transparent)]
    Path(PathError),

    #[error(transparent)]
    Store(#[from] DbError),
}

impl From<PathError> for ShareError {
    fn from(err: PathError) -> Self {
        match err {
            PathError::NotFound | PathError::Forbidden => Self::NotFound,
            other => Self::Path(other),
        }
    }
}
