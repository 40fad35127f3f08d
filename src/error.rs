use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the Tally application
#[derive(Error, Debug)]
pub enum TallyError {
    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database connection failed: {0}")]
    DatabaseConnection(String),

    // Poll errors
    #[error("Invalid poll: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already voted on poll {poll_id}")]
    AlreadyVoted { poll_id: uuid::Uuid },

    // Broadcast errors (contained in the dispatcher, never surfaced to voters)
    #[error("Delivery failed on channel {channel_id}: {reason}")]
    Delivery {
        channel_id: uuid::Uuid,
        reason: String,
    },

    // Authentication errors
    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Tally operations
pub type Result<T> = std::result::Result<T, TallyError>;

impl TallyError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            TallyError::Validation(_)
            | TallyError::InvalidRequest(_)
            | TallyError::InvalidConfig(_) => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            TallyError::AuthenticationFailed
            | TallyError::InvalidCredentials
            | TallyError::JwtError(_) => StatusCode::UNAUTHORIZED,

            // 404 Not Found
            TallyError::NotFound(_) => StatusCode::NOT_FOUND,

            // 409 Conflict
            TallyError::AlreadyVoted { .. } => StatusCode::CONFLICT,

            // 503 Service Unavailable
            TallyError::DatabaseConnection(_) => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            TallyError::Database(_)
            | TallyError::Delivery { .. }
            | TallyError::Io(_)
            | TallyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

// Implement IntoResponse for API error responses
impl IntoResponse for TallyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}
