use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use thiserror::Error as ThisError;

use crate::db::DbError;
use crate::forms::FieldErrors;

const NOT_FOUND_PAGE: &str = include_str!("../templates/errors/404.html");
const SERVER_ERROR_PAGE: &str = include_str!("../templates/errors/500.html");

pub const LOGIN_PATH: &str = "/admin/login";

#[derive(ThisError, Debug)]
pub enum Error {
    /// Submitted form data failed field validation
    #[error("validation failed for {}", .0.field_names().join(", "))]
    Validation(FieldErrors),

    /// Unknown username or wrong password; the two are never distinguished
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Admin route requested without a valid session
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("{resource} with ID {id} not found")]
    NotFound { resource: &'static str, id: i32 },

    /// Uploaded file's extension or content is not on the allow-list
    #[error("unsupported file type for {field}; allowed: {allowed}")]
    UnsupportedFileType { field: &'static str, allowed: String },

    #[error(transparent)]
    Database(#[from] DbError),

    /// Generic internal failure; details are logged, never shown
    #[error("Failed to {operation}")]
    Internal { operation: String },
}

impl Error {
    pub fn internal(operation: impl Into<String>) -> Self {
        Error::Internal {
            operation: operation.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::UnsupportedFileType { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials | Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Database(_) | Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the visitor.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(_) => "Please correct the errors below.".to_string(),
            Error::InvalidCredentials => "Invalid username or password".to_string(),
            Error::Unauthenticated => "Please log in to access this page.".to_string(),
            Error::NotFound { resource, .. } => format!("{resource} not found"),
            Error::UnsupportedFileType { allowed, .. } => {
                format!("Unsupported file type. Allowed: {allowed}")
            }
            Error::Database(_) | Error::Internal { .. } => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Database(_) | Error::Internal { .. } => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Unauthenticated | Error::InvalidCredentials => {
                tracing::info!("Authentication error: {}", self);
            }
            Error::Validation(_) | Error::UnsupportedFileType { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        match self {
            Error::Unauthenticated => Redirect::to(LOGIN_PATH).into_response(),
            Error::NotFound { .. } => (status, Html(NOT_FOUND_PAGE)).into_response(),
            Error::Database(_) | Error::Internal { .. } => {
                (status, Html(SERVER_ERROR_PAGE)).into_response()
            }
            other => (status, other.user_message()).into_response(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
