//! REST API module for guard-rs
//!
//! Provides the HTTP endpoints that expose users and their inbounds

pub mod auth;
pub mod handlers;
pub mod server;

pub use handlers::AppState;
pub use server::{build_router, ApiServer};
