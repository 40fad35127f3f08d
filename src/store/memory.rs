use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, TallyError};
use crate::models::{CreatePollRequest, Poll, PollOption, Viewer, VotedPoll};

use super::{PollStore, ViewerStore};

/// In-memory store
///
/// All mutations run under a single write lock, which serializes vote
/// increments more coarsely than the per-row guarantee of [`super::PgStore`]
/// but satisfies the same contract. Used by unit tests and as a
/// database-free dev mode.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Creation order doubles as list order
    polls: Vec<Poll>,
    voted: HashMap<Uuid, Vec<VotedPoll>>,
    viewers: Vec<Viewer>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn create_poll(&self, req: &CreatePollRequest) -> Result<Poll> {
        req.validate()?;

        let poll = Poll {
            id: Uuid::new_v4(),
            question: req.question.clone(),
            options: req.options.iter().map(|s| PollOption::new(s.as_str())).collect(),
        };

        self.inner.write().await.polls.push(poll.clone());
        Ok(poll)
    }

    async fn get_poll(&self, poll_id: Uuid) -> Result<Option<Poll>> {
        let inner = self.inner.read().await;
        Ok(inner.polls.iter().find(|p| p.id == poll_id).cloned())
    }

    async fn list_polls(&self) -> Result<Vec<Poll>> {
        Ok(self.inner.read().await.polls.clone())
    }

    async fn cast_vote(&self, poll_id: Uuid, option_label: &str) -> Result<i64> {
        let mut inner = self.inner.write().await;

        let poll = inner
            .polls
            .iter_mut()
            .find(|p| p.id == poll_id)
            .ok_or_else(|| TallyError::NotFound(format!("poll {} not found", poll_id)))?;

        let option = poll
            .options
            .iter_mut()
            .find(|o| o.answer == option_label)
            .ok_or_else(|| {
                TallyError::NotFound(format!(
                    "option '{}' not found in poll {}",
                    option_label, poll_id
                ))
            })?;

        option.votes += 1;
        Ok(option.votes)
    }

    async fn has_voted(&self, viewer_id: Uuid, poll_id: Uuid) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .voted
            .get(&viewer_id)
            .is_some_and(|votes| votes.iter().any(|v| v.poll_id == poll_id)))
    }

    async fn record_vote(&self, viewer_id: Uuid, poll_id: Uuid, option_label: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let votes = inner.voted.entry(viewer_id).or_default();

        if votes.iter().any(|v| v.poll_id == poll_id) {
            return Err(TallyError::AlreadyVoted { poll_id });
        }

        votes.push(VotedPoll {
            poll_id,
            answer: option_label.to_string(),
            voted_at: Utc::now(),
        });

        Ok(())
    }

    async fn voted_polls(&self, viewer_id: Uuid) -> Result<Vec<VotedPoll>> {
        let inner = self.inner.read().await;
        Ok(inner.voted.get(&viewer_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl ViewerStore for MemoryStore {
    async fn create_viewer(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Viewer> {
        let mut inner = self.inner.write().await;

        if inner
            .viewers
            .iter()
            .any(|v| v.username == username || v.email == email)
        {
            return Err(TallyError::Validation(
                "username or email already taken".into(),
            ));
        }

        let viewer = Viewer {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };

        inner.viewers.push(viewer.clone());
        Ok(viewer)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Viewer>> {
        let inner = self.inner.read().await;
        Ok(inner
            .viewers
            .iter()
            .find(|v| v.username == username)
            .cloned())
    }
}
