//! guard-rs: User and inbound API for Xray proxy panels
//!
//! Exposes panel users together with the Xray inbounds each user's proxies
//! may use. Allowed inbounds are resolved per request by joining the live
//! Xray configuration with the proxies and per-proxy inbound exclusions
//! stored in the panel database.
//!
//! # Features
//!
//! - `GET /api/users` protected by an `X-API-KEY` header
//! - Administrator-scoped listings
//! - Inbound resolution with protocol normalization, deduplication and
//!   per-proxy exclusions
//! - Graceful degradation when the Xray config or a database read fails
//! - Optional TLS
//!
//! # Example Configuration
//!
//! ```toml
//! api_key = "change-me"
//! database_url = "sqlite:///var/lib/marzban/db.sqlite3"
//! xray_config_path = "/var/lib/marzban/xray_config.json"
//! listen_addr = "0.0.0.0:99"
//! ```
//!
//! Every key can also be given as an environment variable (`API_KEY`,
//! `DATABASE_URL`, ...).

pub mod aggregate;
pub mod api;
pub mod config;
pub mod error;
pub mod inbound;
pub mod logging;
pub mod store;
pub mod tls;

pub use api::ApiServer;
pub use config::GuardConfig;
pub use error::{GuardError, Result};
pub use store::{AdminScope, GuardStore};
