//! API route definitions

use axum::routing::{get, post};
use axum::{Extension, Router};

use super::handlers;
use super::server::AppState;
use super::websocket;

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check (no auth required)
        .route("/health", get(handlers::health::health_check))
        // Account routes
        .route("/api/auth/signup", post(handlers::auth::signup))
        .route("/api/auth/login", post(handlers::auth::login))
        // Protected routes
        .nest("/api", protected_routes())
        // Live-update channel (token passed as query parameter)
        .route("/ws", get(websocket::live::live_ws))
        .layer(Extension(state.session.clone()))
        .with_state(state)
}

/// Routes that require a session token
fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/polls", get(handlers::poll::list_polls))
        .route("/polls", post(handlers::poll::create_poll))
        .route("/polls/:id", get(handlers::poll::get_poll))
        .route("/polls/:id/vote", post(handlers::poll::vote))
        .route("/profile", get(handlers::profile::profile))
}
