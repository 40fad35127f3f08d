//! Vote authorization

mod guard;

pub use guard::VoteSessionGuard;
