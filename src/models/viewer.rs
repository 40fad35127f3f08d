use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An authenticated participant
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Viewer {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// One entry in a viewer's voted-polls record: which poll, which option,
/// and when. Append-only; at most one per (viewer, poll).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct VotedPoll {
    pub poll_id: Uuid,
    pub answer: String,
    pub voted_at: DateTime<Utc>,
}
