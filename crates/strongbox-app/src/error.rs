use salvo::{
    Depot, Request, Response, Writer, async_trait,
    http::{HeaderValue, StatusCode, header},
    writing::Json,
};
use serde::Serialize;
use thiserror::Error;

use strongbox_core::constants::{LOGIN_ROUTE, MISSING_ENTRY_MESSAGE};
use strongbox_service::error::{AccessError, AuthError, PathError, ShareError, UploadError};

/// Application-level errors (HTTP layer)
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Share(#[from] ShareError),

    #[error(transparent)]
    DatabaseError(#[from] strongbox_db::error::DbError),

    #[error(transparent)]
    CoreError(#[from] strongbox_core::error::CoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

/// ## Summary
/// Error response payload
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

impl AppError {
    /// Status code and client-facing message. Confinement failures and missing
    /// entries share one message.
    #[must_use]
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Access(AccessError::Unauthorized) => {
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }
            Self::Auth(err) => auth_status(err),
            Self::Path(err) | Self::Upload(UploadError::Path(err)) => path_status(err),
            Self::Upload(UploadError::MissingFilename) => {
                (StatusCode::BAD_REQUEST, "Missing filename".to_string())
            }
            Self::Upload(UploadError::WriteFailed(_)) => internal(),
            Self::Share(ShareError::NotFound | ShareError::Forbidden) => {
                (StatusCode::NOT_FOUND, MISSING_ENTRY_MESSAGE.to_string())
            }
            Self::Share(ShareError::Path(err)) => path_status(err),
            Self::Share(ShareError::Store(_)) | Self::DatabaseError(_) | Self::CoreError(_) => {
                internal()
            }
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
        }
    }
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        INTERNAL_ERROR_MESSAGE.to_string(),
    )
}

fn auth_status(err: &AuthError) -> (StatusCode, String) {
    let status = match err {
        AuthError::InvalidCredentials | AuthError::WeakCredentials(_) => StatusCode::BAD_REQUEST,
        AuthError::UsernameTaken | AuthError::SetupComplete => StatusCode::CONFLICT,
        AuthError::RegistrationClosed => StatusCode::FORBIDDEN,
        AuthError::UnknownUser => StatusCode::NOT_FOUND,
        AuthError::Hashing(_) | AuthError::Store(_) => return internal(),
    };
    (status, err.to_string())
}

fn path_status(err: &PathError) -> (StatusCode, String) {
    match err {
        PathError::NotFound | PathError::Forbidden => {
            (StatusCode::NOT_FOUND, MISSING_ENTRY_MESSAGE.to_string())
        }
        PathError::DirectoryNotEmpty | PathError::NotADirectory | PathError::IsADirectory => {
            (StatusCode::CONFLICT, err.to_string())
        }
        PathError::Io(_) => internal(),
    }
}

#[async_trait]
impl Writer for AppError {
    async fn write(self, req: &mut Request, _depot: &mut Depot, res: &mut Response) {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            tracing::error!(error = %self, path = %req.uri().path(), "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, path = %req.uri().path(), "Request rejected");
        }

        res.status_code(status);
        if status == StatusCode::UNAUTHORIZED {
            res.headers_mut()
                .insert(header::LOCATION, HeaderValue::from_static(LOGIN_ROUTE));
        }
        res.render(Json(ErrorResponse { error: message }));
    }
}
