use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, warn};

use crate::error::TallyError;
use crate::models::LiveEvent;

use super::registry::ConnectionRegistry;

/// Fans events out to every registered live channel
///
/// The event is serialized once; delivery is attempted against a
/// snapshot of the registry. A closed peer unregisters its channel and
/// never blocks delivery to the remaining channels.
pub struct BroadcastDispatcher {
    registry: Arc<ConnectionRegistry>,
}

impl BroadcastDispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Deliver an event to all currently registered channels
    pub fn broadcast(&self, event: &LiveEvent) {
        let frame = match serde_json::to_string(event) {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "Failed to serialize live event");
                return;
            }
        };

        for channel in self.registry.active_channels() {
            match channel.try_send(frame.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    // Slow consumer; the channel stays open and this
                    // update is dropped for it.
                    debug!(channel_id = %channel.id(), "Channel buffer full, dropping event");
                }
                Err(TrySendError::Closed(_)) => {
                    // Contained here: the voter never sees delivery failures.
                    let err = TallyError::Delivery {
                        channel_id: channel.id(),
                        reason: "peer disconnected".into(),
                    };
                    warn!(channel_id = %channel.id(), error = %err, "Unregistering channel");
                    self.registry.unregister(&channel);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::{LiveChannel, CHANNEL_BUFFER_SIZE};
    use crate::models::{Poll, PollOption};
    use uuid::Uuid;

    fn sample_event() -> LiveEvent {
        LiveEvent::vote_update(Uuid::new_v4(), "Red", 1)
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_channels() {
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = BroadcastDispatcher::new(registry.clone());

        let (a, mut rx_a) = LiveChannel::new(CHANNEL_BUFFER_SIZE);
        let (b, mut rx_b) = LiveChannel::new(CHANNEL_BUFFER_SIZE);
        registry.register(a);
        registry.register(b);

        let event = sample_event();
        dispatcher.broadcast(&event);

        let expected = serde_json::to_string(&event).unwrap();
        assert_eq!(rx_a.recv().await.unwrap(), expected);
        assert_eq!(rx_b.recv().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_failed_channel_is_removed_and_others_still_delivered() {
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = BroadcastDispatcher::new(registry.clone());

        let (healthy, mut rx_healthy) = LiveChannel::new(CHANNEL_BUFFER_SIZE);
        let (dead, rx_dead) = LiveChannel::new(CHANNEL_BUFFER_SIZE);
        registry.register(healthy);
        registry.register(dead.clone());

        // Peer went away: its receiving half is gone.
        drop(rx_dead);

        dispatcher.broadcast(&sample_event());

        assert!(rx_healthy.recv().await.is_some());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.state(&dead), crate::live::ChannelState::Closed);
    }

    #[tokio::test]
    async fn test_events_are_fifo_per_channel() {
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = BroadcastDispatcher::new(registry.clone());

        let (channel, mut rx) = LiveChannel::new(CHANNEL_BUFFER_SIZE);
        registry.register(channel);

        let poll_id = Uuid::new_v4();
        let first = LiveEvent::new_poll(Poll {
            id: poll_id,
            question: "Best color?".to_string(),
            options: vec![PollOption::new("Red")],
        });
        let second = LiveEvent::vote_update(poll_id, "Red", 1);

        dispatcher.broadcast(&first);
        dispatcher.broadcast(&second);

        assert_eq!(
            rx.recv().await.unwrap(),
            serde_json::to_string(&first).unwrap()
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_full_buffer_drops_event_but_keeps_channel() {
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = BroadcastDispatcher::new(registry.clone());

        let (channel, mut rx) = LiveChannel::new(1);
        registry.register(channel);

        dispatcher.broadcast(&sample_event());
        dispatcher.broadcast(&sample_event());

        assert!(rx.recv().await.is_some());
        assert_eq!(registry.len(), 1);
    }
}
