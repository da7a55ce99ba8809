// HTTP surface: axum router, handlers and error mapping
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::create_router;
pub use state::AppState;
