//! HTTP and WebSocket API
//!
//! REST endpoints for accounts and polls, plus the live-update
//! WebSocket channel.

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod websocket;

pub use server::{AppState, TallyServer};
