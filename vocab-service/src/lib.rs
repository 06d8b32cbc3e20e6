pub mod app;
pub mod config;
pub mod directory;
pub mod error;
pub mod metrics;
pub mod session_handlers;
pub mod user_handlers;

pub use app::{build_router, AppState};
