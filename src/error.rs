//! Error types shared by the composer, the gateways and the HTTP server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Every failure a bug report operation can hit.
///
/// None of these are fatal to the application; each one is recoverable by
/// retrying the operation.
#[derive(Error, Debug)]
pub enum BugError {
    /// Input was rejected before reaching the store.
    #[error("{message}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// Message shown next to the field.
        message: String,
    },

    /// The embedding application's context provider failed.
    #[error("failed to collect context data: {0}")]
    ContextCollection(String),

    /// The request never got a usable answer from the store.
    #[error("transport error: {0}")]
    Transport(String),

    /// The store failed while writing.
    #[error("failed to persist bug report: {0}")]
    Persistence(String),

    /// The store failed while reading.
    #[error("failed to retrieve bug reports: {0}")]
    Retrieval(String),

    /// The referenced record does not exist.
    #[error("bug #{id} not found")]
    NotFound {
        /// Id that was looked up.
        id: i64,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, BugError>;

impl BugError {
    /// Shorthand for a validation failure on `field`.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// HTTP status this error maps to when returned by a handler.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Transport(_) => StatusCode::BAD_GATEWAY,
            Self::ContextCollection(_)
            | Self::Persistence(_)
            | Self::Retrieval(_)
            | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<figment::Error> for BugError {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl IntoResponse for BugError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
