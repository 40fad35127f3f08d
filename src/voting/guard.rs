use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Result, TallyError};
use crate::store::PollStore;

/// Gates duplicate voting: one vote per viewer per poll
///
/// The check-then-append around the store is a critical section per
/// (viewer, poll) pair, so two concurrent votes by the same viewer on
/// the same poll cannot both succeed. Votes by different viewers, or on
/// different polls, do not contend.
pub struct VoteSessionGuard {
    store: Arc<dyn PollStore>,
    locks: DashMap<(Uuid, Uuid), Arc<Mutex<()>>>,
}

impl VoteSessionGuard {
    pub fn new(store: Arc<dyn PollStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    /// Authorize and apply one vote
    ///
    /// On success exactly one option counter is incremented and the poll
    /// is appended to the viewer's voted-polls record; the new count is
    /// returned.
    pub async fn authorize_vote(
        &self,
        viewer_id: Uuid,
        poll_id: Uuid,
        option_label: &str,
    ) -> Result<i64> {
        let key = (viewer_id, poll_id);
        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _held = lock.lock().await;
            self.vote_once(viewer_id, poll_id, option_label).await
        };

        // Last one out removes the pair's entry, success or not; poll_id
        // is client input, so rejected attempts must not pin map entries.
        // A concurrent waiter holds its own Arc clone of the mutex, which
        // keeps the count above two and the entry alive until it is done.
        self.locks.remove_if(&key, |_, lock| Arc::strong_count(lock) <= 2);

        result
    }

    /// The critical section: runs under the pair's lock
    async fn vote_once(&self, viewer_id: Uuid, poll_id: Uuid, option_label: &str) -> Result<i64> {
        if self.store.has_voted(viewer_id, poll_id).await? {
            warn!(viewer_id = %viewer_id, poll_id = %poll_id, "Duplicate vote rejected");
            return Err(TallyError::AlreadyVoted { poll_id });
        }

        let votes = self.store.cast_vote(poll_id, option_label).await?;
        self.store
            .record_vote(viewer_id, poll_id, option_label)
            .await?;

        info!(
            viewer_id = %viewer_id,
            poll_id = %poll_id,
            option = option_label,
            votes = votes,
            "Vote recorded"
        );

        Ok(votes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreatePollRequest;
    use crate::store::MemoryStore;

    fn request(question: &str, options: &[&str]) -> CreatePollRequest {
        CreatePollRequest {
            question: question.to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
        }
    }

    async fn guard_with_poll() -> (Arc<VoteSessionGuard>, Uuid, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let poll = store
            .create_poll(&request("Best color?", &["Red", "Blue"]))
            .await
            .unwrap();
        let guard = Arc::new(VoteSessionGuard::new(store.clone()));
        (guard, poll.id, store)
    }

    #[tokio::test]
    async fn test_second_vote_by_same_viewer_is_rejected() {
        let (guard, poll_id, store) = guard_with_poll().await;
        let viewer = Uuid::new_v4();

        assert_eq!(guard.authorize_vote(viewer, poll_id, "Red").await.unwrap(), 1);

        let err = guard
            .authorize_vote(viewer, poll_id, "Red")
            .await
            .unwrap_err();
        assert!(matches!(err, TallyError::AlreadyVoted { .. }));

        // The counter was not touched a second time.
        let poll = store.get_poll(poll_id).await.unwrap().unwrap();
        assert_eq!(poll.option("Red").unwrap().votes, 1);
    }

    #[tokio::test]
    async fn test_concurrent_votes_by_same_viewer_succeed_once() {
        let (guard, poll_id, store) = guard_with_poll().await;
        let viewer = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let guard = guard.clone();
            handles.push(tokio::spawn(async move {
                guard.authorize_vote(viewer, poll_id, "Red").await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        let poll = store.get_poll(poll_id).await.unwrap().unwrap();
        assert_eq!(poll.option("Red").unwrap().votes, 1);
    }

    #[tokio::test]
    async fn test_two_distinct_viewers_both_count() {
        let (guard, poll_id, store) = guard_with_poll().await;
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let guard_a = guard.clone();
        let guard_b = guard.clone();
        let (ra, rb) = tokio::join!(
            tokio::spawn(async move { guard_a.authorize_vote(a, poll_id, "Red").await }),
            tokio::spawn(async move { guard_b.authorize_vote(b, poll_id, "Red").await }),
        );
        ra.unwrap().unwrap();
        rb.unwrap().unwrap();

        let poll = store.get_poll(poll_id).await.unwrap().unwrap();
        assert_eq!(poll.option("Red").unwrap().votes, 2);
    }

    #[tokio::test]
    async fn test_lock_map_is_emptied_on_every_exit_path() {
        let (guard, poll_id, _store) = guard_with_poll().await;
        let viewer = Uuid::new_v4();

        guard.authorize_vote(viewer, poll_id, "Red").await.unwrap();
        assert!(guard.locks.is_empty());

        // Rejected duplicate
        let err = guard
            .authorize_vote(viewer, poll_id, "Red")
            .await
            .unwrap_err();
        assert!(matches!(err, TallyError::AlreadyVoted { .. }));
        assert!(guard.locks.is_empty());

        // Unknown poll ids come from client input; rejections must not
        // pin entries.
        for _ in 0..32 {
            let err = guard
                .authorize_vote(viewer, Uuid::new_v4(), "Red")
                .await
                .unwrap_err();
            assert!(matches!(err, TallyError::NotFound(_)));
        }
        assert!(guard.locks.is_empty());
    }

    #[tokio::test]
    async fn test_vote_on_unknown_option_leaves_record_clean() {
        let (guard, poll_id, store) = guard_with_poll().await;
        let viewer = Uuid::new_v4();

        let err = guard
            .authorize_vote(viewer, poll_id, "Green")
            .await
            .unwrap_err();
        assert!(matches!(err, TallyError::NotFound(_)));

        // The failed attempt did not consume the viewer's vote.
        assert!(!store.has_voted(viewer, poll_id).await.unwrap());
        assert_eq!(guard.authorize_vote(viewer, poll_id, "Red").await.unwrap(), 1);
    }
}
