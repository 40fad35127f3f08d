//! Tally - Real-Time Polling Server
//!
//! A polling/voting web service written in Rust.
//!
//! ## Features
//!
//! - Poll creation with ordered, named options
//! - One vote per viewer per poll, enforced under concurrency
//! - Live vote updates pushed to every connected viewer over WebSocket
//! - Viewer accounts with salted PBKDF2 password hashes and JWT sessions
//! - PostgreSQL persistence with atomic vote increments

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod live;
pub mod models;
pub mod security;
pub mod store;
pub mod voting;

pub use config::Config;
pub use database::Database;
pub use error::{Result, TallyError};
