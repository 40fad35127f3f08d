//! WebSocket handlers
//!
//! Each connection gets a bounded per-channel queue; delivery uses
//! try_send so one slow viewer cannot back-pressure the rest.

pub mod live;
