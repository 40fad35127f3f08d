//! Account handlers: signup and login

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::server::AppState;
use crate::error::{Result, TallyError};
use crate::security;

/// Signup request
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Issued on successful signup or login
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub expires_in: i64,
}

/// Create a viewer account and start a session
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse> {
    if req.username.trim().is_empty() || req.email.trim().is_empty() {
        return Err(TallyError::InvalidRequest(
            "username and email are required".into(),
        ));
    }
    if req.password.is_empty() {
        return Err(TallyError::InvalidRequest("password is required".into()));
    }

    let password_hash = security::hash_password(&req.password, state.config.auth.hash_iterations)?;
    let viewer = state
        .viewers
        .create_viewer(&req.username, &req.email, &password_hash)
        .await?;

    let expiry_hours = state.config.auth.token_expiry_hours;
    let token = state.session.issue_token(viewer.id, expiry_hours)?;

    info!(viewer_id = %viewer.id, username = %viewer.username, "Viewer signed up");

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            token,
            expires_in: expiry_hours * 3600,
        }),
    ))
}

/// Verify credentials and start a session
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let viewer = state.viewers.find_by_username(&req.username).await?;

    // Deliberately vague on which part was wrong.
    let Some(viewer) = viewer else {
        warn!(username = %req.username, "Login failed: unknown username");
        return Err(TallyError::InvalidCredentials);
    };

    if !security::verify_password(&req.password, &viewer.password_hash) {
        warn!(viewer_id = %viewer.id, "Login failed: wrong password");
        return Err(TallyError::InvalidCredentials);
    }

    let expiry_hours = state.config.auth.token_expiry_hours;
    let token = state.session.issue_token(viewer.id, expiry_hours)?;

    info!(viewer_id = %viewer.id, username = %viewer.username, "Viewer logged in");

    Ok((
        StatusCode::OK,
        Json(SessionResponse {
            token,
            expires_in: expiry_hours * 3600,
        }),
    ))
}
