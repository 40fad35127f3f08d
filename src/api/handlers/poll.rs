//! Poll handlers: create, read, and the HTTP vote path

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::api::middleware::AuthenticatedViewer;
use crate::api::server::AppState;
use crate::error::{Result, TallyError};
use crate::models::{CreatePollRequest, LiveEvent};

/// Request body for the HTTP vote path
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    #[serde(rename = "selectedOption")]
    pub selected_option: String,
}

/// Returned to the voter on success
#[derive(Debug, Serialize)]
pub struct VoteResponse {
    #[serde(rename = "pollId")]
    pub poll_id: Uuid,
    #[serde(rename = "selectedOption")]
    pub selected_option: String,
    pub votes: i64,
}

/// Create a poll and announce it to all live channels
pub async fn create_poll(
    State(state): State<AppState>,
    viewer: AuthenticatedViewer,
    Json(req): Json<CreatePollRequest>,
) -> Result<impl IntoResponse> {
    let poll = state.store.create_poll(&req).await?;

    info!(
        poll_id = %poll.id,
        viewer_id = %viewer.viewer_id,
        question = %poll.question,
        "Poll created"
    );

    state.dispatcher.broadcast(&LiveEvent::new_poll(poll.clone()));

    Ok((StatusCode::CREATED, Json(poll)))
}

/// List all polls
pub async fn list_polls(
    State(state): State<AppState>,
    _viewer: AuthenticatedViewer,
) -> Result<impl IntoResponse> {
    let polls = state.store.list_polls().await?;
    Ok(Json(polls))
}

/// Get a single poll
pub async fn get_poll(
    State(state): State<AppState>,
    _viewer: AuthenticatedViewer,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    match state.store.get_poll(id).await? {
        Some(poll) => Ok(Json(poll)),
        None => Err(TallyError::NotFound(format!("poll {} not found", id))),
    }
}

/// Cast a vote over HTTP
///
/// Same guard and broadcast as the WebSocket path.
pub async fn vote(
    State(state): State<AppState>,
    viewer: AuthenticatedViewer,
    Path(id): Path<Uuid>,
    Json(req): Json<VoteRequest>,
) -> Result<impl IntoResponse> {
    let votes = state
        .guard
        .authorize_vote(viewer.viewer_id, id, &req.selected_option)
        .await?;

    state.dispatcher.broadcast(&LiveEvent::vote_update(
        id,
        req.selected_option.clone(),
        votes,
    ));

    Ok(Json(VoteResponse {
        poll_id: id,
        selected_option: req.selected_option,
        votes,
    }))
}
