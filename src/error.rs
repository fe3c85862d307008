use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::media::MediaError;
use crate::prompts::RepresentError;
use crate::repository::RepositoryError;
use crate::votes::VoteError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Dangling reference: {0}")]
    DanglingReference(String),

    #[error("Vote error: {0}")]
    InvalidOperand(#[from] VoteError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(_) => AppError::NotFound,
            RepositoryError::Conflict(msg) => AppError::Conflict(msg),
            RepositoryError::UnknownReference(what) => {
                AppError::BadRequest(format!("{} does not exist", what))
            }
            RepositoryError::Corrupt(e) => AppError::InvalidOperand(e),
            RepositoryError::Database(e) => AppError::Pool(e),
            RepositoryError::Sql(e) => AppError::Database(e),
        }
    }
}

impl From<RepresentError> for AppError {
    fn from(err: RepresentError) -> Self {
        match err {
            RepresentError::DanglingReference(msg) => AppError::DanglingReference(msg),
            RepresentError::Vote(e) => AppError::InvalidOperand(e),
            RepresentError::Repository(e) => e.into(),
        }
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::UnsupportedType(_) | MediaError::InvalidPath(_) => {
                AppError::BadRequest(err.to_string())
            }
            MediaError::TooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            MediaError::Io(e) => AppError::Internal(format!("media storage: {}", e)),
        }
    }
}

fn internal(kind: &str, detail: &dyn std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("{}: {}", kind, detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()),
            AppError::DanglingReference(msg) => internal("Dangling reference", msg),
            AppError::InvalidOperand(e) => internal("Vote aggregation error", e),
            AppError::Database(e) => internal("Database error", e),
            AppError::Pool(e) => internal("Pool error", e),
            AppError::Internal(msg) => internal("Internal error", msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
