use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// Identifier of a live channel, assigned at construction
pub type ChannelId = Uuid;

/// Lifecycle of a live channel
///
/// `Closed` is terminal: a closed channel is never reused or
/// re-registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}

/// One viewer's live-update channel: the sending half of a bounded
/// per-connection queue. Frames are delivered in send order; the
/// receiving half is drained by that connection's socket task.
///
/// The closed flag is shared by every clone of a channel, so once any
/// holder closes it, all holders see it closed.
#[derive(Clone)]
pub struct LiveChannel {
    id: ChannelId,
    tx: mpsc::Sender<String>,
    closed: Arc<AtomicBool>,
}

impl LiveChannel {
    /// Create a channel and hand back the receiving half for the socket
    /// task to drain
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer);
        (
            Self {
                id: Uuid::new_v4(),
                tx,
                closed: Arc::new(AtomicBool::new(false)),
            },
            rx,
        )
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Whether this channel has been closed (terminal)
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Queue a frame without blocking
    pub fn try_send(&self, frame: String) -> Result<(), mpsc::error::TrySendError<String>> {
        self.tx.try_send(frame)
    }
}

/// The process-local set of currently open live channels
///
/// Owned state: callers receive it through the dispatcher's constructor,
/// never via ambient lookup. All operations are safe under concurrent
/// access from independent connection tasks. No state is retained for
/// channels that have come and gone.
#[derive(Default)]
pub struct ConnectionRegistry {
    channels: DashMap<ChannelId, LiveChannel>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a channel to the active set
    ///
    /// Idempotent per distinct channel; a channel that was already closed
    /// is refused. Returns whether the channel is now registered.
    pub fn register(&self, channel: LiveChannel) -> bool {
        if channel.is_closed() {
            debug!(channel_id = %channel.id(), "Refusing to re-register closed channel");
            return false;
        }

        self.channels.entry(channel.id()).or_insert(channel);
        true
    }

    /// Remove a channel from the active set and mark it closed
    ///
    /// Safe to call for a channel that was already removed.
    pub fn unregister(&self, channel: &LiveChannel) {
        channel.close();
        if self.channels.remove(&channel.id()).is_some() {
            debug!(channel_id = %channel.id(), "Channel unregistered");
        }
    }

    /// Snapshot of the currently registered channels
    ///
    /// The returned set is a copy; concurrent register/unregister calls
    /// do not mutate it during iteration.
    pub fn active_channels(&self) -> Vec<LiveChannel> {
        self.channels.iter().map(|e| e.value().clone()).collect()
    }

    /// Lifecycle state of a channel as the registry sees it
    pub fn state(&self, channel: &LiveChannel) -> ChannelState {
        if channel.is_closed() {
            ChannelState::Closed
        } else if self.channels.contains_key(&channel.id()) {
            ChannelState::Open
        } else {
            ChannelState::Connecting
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::CHANNEL_BUFFER_SIZE;

    #[tokio::test]
    async fn test_register_is_idempotent_per_channel() {
        let registry = ConnectionRegistry::new();
        let (channel, _rx) = LiveChannel::new(CHANNEL_BUFFER_SIZE);

        assert!(registry.register(channel.clone()));
        assert!(registry.register(channel.clone()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.state(&channel), ChannelState::Open);
    }

    #[tokio::test]
    async fn test_unregister_is_safe_when_absent() {
        let registry = ConnectionRegistry::new();
        let (channel, _rx) = LiveChannel::new(CHANNEL_BUFFER_SIZE);

        registry.unregister(&channel);
        registry.unregister(&channel);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_closed_channel_is_never_re_registered() {
        let registry = ConnectionRegistry::new();
        let (channel, _rx) = LiveChannel::new(CHANNEL_BUFFER_SIZE);

        assert!(registry.register(channel.clone()));
        registry.unregister(&channel);
        assert_eq!(registry.state(&channel), ChannelState::Closed);

        // Every clone shares the closed flag.
        assert!(!registry.register(channel.clone()));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_registry_retains_no_state_for_past_connections() {
        let registry = ConnectionRegistry::new();

        for _ in 0..100 {
            let (channel, _rx) = LiveChannel::new(CHANNEL_BUFFER_SIZE);
            assert!(registry.register(channel.clone()));
            registry.unregister(&channel);
        }

        // The channel map is the registry's only state; a century of
        // connects and disconnects must leave it empty.
        assert!(registry.channels.is_empty());

        let (fresh, _rx) = LiveChannel::new(CHANNEL_BUFFER_SIZE);
        assert!(registry.register(fresh.clone()));
        assert_eq!(registry.state(&fresh), ChannelState::Open);
    }

    #[tokio::test]
    async fn test_snapshot_is_unaffected_by_later_mutation() {
        let registry = ConnectionRegistry::new();
        let (a, _rx_a) = LiveChannel::new(CHANNEL_BUFFER_SIZE);
        let (b, _rx_b) = LiveChannel::new(CHANNEL_BUFFER_SIZE);

        registry.register(a.clone());
        registry.register(b.clone());

        let snapshot = registry.active_channels();
        assert_eq!(snapshot.len(), 2);

        registry.unregister(&a);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_frames_arrive_in_send_order() {
        let (channel, mut rx) = LiveChannel::new(CHANNEL_BUFFER_SIZE);

        channel.try_send("first".to_string()).unwrap();
        channel.try_send("second".to_string()).unwrap();

        assert_eq!(rx.recv().await.unwrap(), "first");
        assert_eq!(rx.recv().await.unwrap(), "second");
    }
}
