//! Poll and viewer persistence
//!
//! The server runs against [`PgStore`]; unit tests (and a zero-dependency
//! dev mode) use [`MemoryStore`]. Both uphold the same contract: option
//! order is preserved, vote increments are atomic per poll, and the
//! voted-polls record admits at most one entry per (viewer, poll).

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{CreatePollRequest, Poll, Viewer, VotedPoll};

/// Storage contract for polls and vote tallies
#[async_trait]
pub trait PollStore: Send + Sync {
    /// Create a poll with all option counters at zero
    ///
    /// Fails with `Validation` on an empty question, empty options, or
    /// duplicate option labels; nothing is stored in that case.
    async fn create_poll(&self, req: &CreatePollRequest) -> Result<Poll>;

    /// Fetch a single poll, options in display order
    async fn get_poll(&self, poll_id: Uuid) -> Result<Option<Poll>>;

    /// Fetch all polls, oldest first
    async fn list_polls(&self) -> Result<Vec<Poll>>;

    /// Atomically increment the named option's counter, returning the
    /// new count
    ///
    /// Fails with `NotFound` if the poll or the option does not exist.
    /// Concurrent calls against the same poll must not lose updates.
    async fn cast_vote(&self, poll_id: Uuid, option_label: &str) -> Result<i64>;

    /// Whether the viewer's voted-polls record already names this poll
    async fn has_voted(&self, viewer_id: Uuid, poll_id: Uuid) -> Result<bool>;

    /// Append a poll to the viewer's voted-polls record
    async fn record_vote(&self, viewer_id: Uuid, poll_id: Uuid, option_label: &str) -> Result<()>;

    /// The viewer's voted-polls record, oldest first
    async fn voted_polls(&self, viewer_id: Uuid) -> Result<Vec<VotedPoll>>;
}

/// Storage contract for viewer accounts
#[async_trait]
pub trait ViewerStore: Send + Sync {
    /// Create a viewer account
    ///
    /// Fails with `Validation` if the username or email is already taken.
    async fn create_viewer(&self, username: &str, email: &str, password_hash: &str)
        -> Result<Viewer>;

    /// Look up a viewer by username
    async fn find_by_username(&self, username: &str) -> Result<Option<Viewer>>;
}
