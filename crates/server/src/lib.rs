//! HTTP surface for the Drover coordination server.

pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod redirect;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
