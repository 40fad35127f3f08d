pub mod event;
pub mod poll;
pub mod viewer;

pub use event::*;
pub use poll::*;
pub use viewer::*;
