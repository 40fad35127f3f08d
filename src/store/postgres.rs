use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, TallyError};
use crate::models::{CreatePollRequest, Poll, PollOption, Viewer, VotedPoll};

use super::{PollStore, ViewerStore};

/// PostgreSQL-backed store
///
/// Vote increments happen in SQL (`votes = votes + 1`), so concurrent
/// casts against the same poll serialize at the row level and cannot
/// lose updates.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct PollRow {
    id: Uuid,
    question: String,
}

#[derive(FromRow)]
struct OptionRow {
    poll_id: Uuid,
    answer: String,
    votes: i64,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn poll_exists(&self, poll_id: Uuid) -> Result<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM polls WHERE id = $1)")
                .bind(poll_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }
}

#[async_trait]
impl PollStore for PgStore {
    async fn create_poll(&self, req: &CreatePollRequest) -> Result<Poll> {
        req.validate()?;

        let mut tx = self.pool.begin().await?;

        let poll_id: Uuid =
            sqlx::query_scalar("INSERT INTO polls (question) VALUES ($1) RETURNING id")
                .bind(&req.question)
                .fetch_one(&mut *tx)
                .await?;

        for (position, answer) in req.options.iter().enumerate() {
            sqlx::query(
                "INSERT INTO poll_options (poll_id, position, answer) VALUES ($1, $2, $3)",
            )
            .bind(poll_id)
            .bind(position as i32)
            .bind(answer)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(poll_id = %poll_id, question = %req.question, "Created poll");

        Ok(Poll {
            id: poll_id,
            question: req.question.clone(),
            options: req.options.iter().map(|s| PollOption::new(s.as_str())).collect(),
        })
    }

    async fn get_poll(&self, poll_id: Uuid) -> Result<Option<Poll>> {
        let row = sqlx::query_as::<_, PollRow>("SELECT id, question FROM polls WHERE id = $1")
            .bind(poll_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let options = sqlx::query_as::<_, OptionRow>(
            r#"
            SELECT poll_id, answer, votes
            FROM poll_options
            WHERE poll_id = $1
            ORDER BY position
            "#,
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Poll {
            id: row.id,
            question: row.question,
            options: options
                .into_iter()
                .map(|o| PollOption {
                    answer: o.answer,
                    votes: o.votes,
                })
                .collect(),
        }))
    }

    async fn list_polls(&self) -> Result<Vec<Poll>> {
        let rows =
            sqlx::query_as::<_, PollRow>("SELECT id, question FROM polls ORDER BY created_at")
                .fetch_all(&self.pool)
                .await?;

        let options = sqlx::query_as::<_, OptionRow>(
            r#"
            SELECT o.poll_id, o.answer, o.votes
            FROM poll_options o
            JOIN polls p ON p.id = o.poll_id
            ORDER BY p.created_at, o.position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut polls: Vec<Poll> = rows
            .into_iter()
            .map(|r| Poll {
                id: r.id,
                question: r.question,
                options: Vec::new(),
            })
            .collect();

        for opt in options {
            if let Some(poll) = polls.iter_mut().find(|p| p.id == opt.poll_id) {
                poll.options.push(PollOption {
                    answer: opt.answer,
                    votes: opt.votes,
                });
            }
        }

        Ok(polls)
    }

    async fn cast_vote(&self, poll_id: Uuid, option_label: &str) -> Result<i64> {
        let votes = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE poll_options
            SET votes = votes + 1
            WHERE poll_id = $1 AND answer = $2
            RETURNING votes
            "#,
        )
        .bind(poll_id)
        .bind(option_label)
        .fetch_optional(&self.pool)
        .await?;

        match votes {
            Some(votes) => Ok(votes),
            None if self.poll_exists(poll_id).await? => Err(TallyError::NotFound(format!(
                "option '{}' not found in poll {}",
                option_label, poll_id
            ))),
            None => Err(TallyError::NotFound(format!("poll {} not found", poll_id))),
        }
    }

    async fn has_voted(&self, viewer_id: Uuid, poll_id: Uuid) -> Result<bool> {
        let voted = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM voted_polls WHERE viewer_id = $1 AND poll_id = $2)",
        )
        .bind(viewer_id)
        .bind(poll_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(voted)
    }

    async fn record_vote(&self, viewer_id: Uuid, poll_id: Uuid, option_label: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO voted_polls (viewer_id, poll_id, answer)
            VALUES ($1, $2, $3)
            ON CONFLICT (viewer_id, poll_id) DO NOTHING
            "#,
        )
        .bind(viewer_id)
        .bind(poll_id)
        .bind(option_label)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TallyError::AlreadyVoted { poll_id });
        }

        Ok(())
    }

    async fn voted_polls(&self, viewer_id: Uuid) -> Result<Vec<VotedPoll>> {
        let votes = sqlx::query_as::<_, VotedPoll>(
            r#"
            SELECT poll_id, answer, voted_at
            FROM voted_polls
            WHERE viewer_id = $1
            ORDER BY voted_at
            "#,
        )
        .bind(viewer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(votes)
    }
}

#[async_trait]
impl ViewerStore for PgStore {
    async fn create_viewer(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Viewer> {
        let viewer = sqlx::query_as::<_, Viewer>(
            r#"
            INSERT INTO viewers (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                TallyError::Validation("username or email already taken".into())
            }
            other => TallyError::Database(other),
        })?;

        info!(viewer_id = %viewer.id, username = %viewer.username, "Created viewer");
        Ok(viewer)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Viewer>> {
        let viewer = sqlx::query_as::<_, Viewer>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM viewers
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(viewer)
    }
}
