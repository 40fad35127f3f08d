//! API middleware

mod cors;
mod session;

pub use cors::cors_layer;
pub use session::{AuthenticatedViewer, Claims, SessionAuth};
