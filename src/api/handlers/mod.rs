pub mod auth;
pub mod health;
pub mod poll;
pub mod profile;
