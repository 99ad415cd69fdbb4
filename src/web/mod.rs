//! # Web application module
//!
//! Contains the application and the handlers for:
//! * Application submissions (`POST /api/apply`)
//! * The static site, for every other path

mod app;
mod errors;
mod handlers;
pub mod serve_static;

pub use app::{build_app, AppState};
pub use errors::ApiError;
pub use handlers::ApplyResponse;
