//! Configuration for guard-rs
//!
//! Settings are layered with the `config` crate: an optional TOML file
//! (`guard.toml` by default) followed by environment variables, so a
//! plain `API_KEY=... DATABASE_URL=...` environment is enough to start.

use ::config::builder::DefaultState;
use ::config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{GuardError, Result};
use crate::store::AdminScope;

/// Main service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GuardConfig {
    /// Key expected in the `X-API-KEY` header
    #[serde(default)]
    pub api_key: String,
    /// sqlx connection string (e.g., "sqlite:///var/lib/marzban/db.sqlite3")
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Path to the Xray JSON configuration
    #[serde(default = "default_xray_config_path")]
    pub xray_config_path: String,
    /// Listen address (e.g., "0.0.0.0:99")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// PEM certificate; TLS is enabled only with a key as well
    pub api_ssl_cert_file: Option<String>,
    /// PEM private key
    pub api_ssl_key_file: Option<String>,
    /// Default administrator scope; all users when unset
    pub admin_username: Option<String>,
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,
    /// Pool acquire timeout in seconds
    #[serde(default = "default_database_timeout")]
    pub database_timeout_seconds: u64,
    /// Create missing tables on startup (development databases only)
    #[serde(default)]
    pub database_init_schema: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// One of "pretty", "json", "compact"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_database_url() -> String {
    "sqlite://guard.db".to_string()
}

fn default_xray_config_path() -> String {
    "/usr/local/etc/xray/config.json".to_string()
}

fn default_listen_addr() -> String {
    "0.0.0.0:99".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_database_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl GuardConfig {
    /// Load configuration from an optional file plus the environment.
    ///
    /// With no explicit path, `guard.toml` in the working directory is used
    /// if present. An explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let builder = Config::builder();
        let builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name("guard").required(false)),
        };

        Self::from_builder(builder.add_source(Environment::default().try_parsing(true)))
    }

    /// Parse configuration from a TOML string, ignoring the environment
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::from_builder(Config::builder().add_source(File::from_str(content, FileFormat::Toml)))
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config: GuardConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(GuardError::Config("API_KEY is required".to_string()));
        }

        match (&self.api_ssl_cert_file, &self.api_ssl_key_file) {
            (Some(_), None) | (None, Some(_)) => {
                return Err(GuardError::Config(
                    "api_ssl_cert_file and api_ssl_key_file must be set together".to_string(),
                ));
            }
            _ => {}
        }

        if !matches!(self.log_format.as_str(), "pretty" | "json" | "compact") {
            return Err(GuardError::Config(format!(
                "Unknown log format '{}'",
                self.log_format
            )));
        }

        Ok(())
    }

    /// TLS is enabled when both certificate and key are configured
    pub fn tls_enabled(&self) -> bool {
        self.api_ssl_cert_file.is_some() && self.api_ssl_key_file.is_some()
    }

    /// Scope applied when a request does not name an administrator
    pub fn default_scope(&self) -> AdminScope {
        AdminScope::from(self.admin_username.clone())
    }
}
