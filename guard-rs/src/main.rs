//! guard-rs: User and inbound API server

use guard_rs::logging::init_logging;
use guard_rs::{ApiServer, GuardConfig};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (optional file path as first argument)
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = GuardConfig::load(config_path.as_deref())?;

    // Initialize logging
    init_logging(&config.log_level, &config.log_format);

    info!("Starting guard-rs v{}", env!("CARGO_PKG_VERSION"));
    match config_path {
        Some(ref path) => info!("Configuration loaded from {}", path.display()),
        None => info!("Configuration loaded"),
    }

    let server = ApiServer::from_config(&config).await?;
    if config.tls_enabled() {
        info!(
            "SSL enabled. Cert: {}, Key: {}",
            config.api_ssl_cert_file.as_deref().unwrap_or_default(),
            config.api_ssl_key_file.as_deref().unwrap_or_default()
        );
    }

    server.run().await?;

    Ok(())
}
