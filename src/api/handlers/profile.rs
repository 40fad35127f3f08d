//! Viewer profile: the polls this viewer has voted on

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::api::middleware::AuthenticatedViewer;
use crate::api::server::AppState;
use crate::error::Result;
use crate::models::VotedPoll;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(rename = "viewerId")]
    pub viewer_id: Uuid,
    #[serde(rename = "votedPolls")]
    pub voted_polls: Vec<VotedPoll>,
}

/// The authenticated viewer's voting history
pub async fn profile(
    State(state): State<AppState>,
    viewer: AuthenticatedViewer,
) -> Result<impl IntoResponse> {
    let voted_polls = state.store.voted_polls(viewer.viewer_id).await?;

    Ok(Json(ProfileResponse {
        viewer_id: viewer.viewer_id,
        voted_polls,
    }))
}
