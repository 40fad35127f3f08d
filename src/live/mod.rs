//! Live-update channels: registry and broadcast fan-out

mod dispatcher;
mod registry;

pub use dispatcher::BroadcastDispatcher;
pub use registry::{ChannelId, ChannelState, ConnectionRegistry, LiveChannel};

/// Maximum number of frames buffered per live channel
pub const CHANNEL_BUFFER_SIZE: usize = 256;
