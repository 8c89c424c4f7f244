//! Request-scoped inbound resolution over live inputs
//!
//! Loads the Xray configuration, proxies and exclusions concurrently and
//! resolves them. A failing loader contributes nothing instead of failing
//! the whole resolution; the failure is logged.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::exclusion::ExclusionIndex;
use super::parser::{load_protocol_index, ProtocolIndex};
use super::resolver::resolve;
use super::types::ResolvedInbounds;
use crate::error::GuardError;
use crate::store::{AdminScope, GuardStore};

/// Resolves inbounds from the database and the Xray configuration file
#[derive(Clone)]
pub struct InboundService {
    store: GuardStore,
    xray_config_path: PathBuf,
}

impl InboundService {
    pub fn new(store: GuardStore, xray_config_path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            xray_config_path: xray_config_path.into(),
        }
    }

    pub fn xray_config_path(&self) -> &Path {
        &self.xray_config_path
    }

    /// Resolve inbounds for every user in `scope`
    pub async fn resolve(&self, scope: &AdminScope) -> ResolvedInbounds {
        let (index, proxies, exclusions) = tokio::join!(
            load_protocol_index(&self.xray_config_path),
            self.store.fetch_proxies(scope),
            self.store.fetch_exclusions(scope),
        );

        let index = index.unwrap_or_else(|e| {
            match &e {
                GuardError::NotFound(_) => warn!("{}", e),
                _ => warn!("Failed to load Xray config: {}", e),
            }
            ProtocolIndex::default()
        });

        let proxies = proxies.unwrap_or_else(|e| {
            warn!("Failed to fetch proxies: {}", e);
            Vec::new()
        });

        let exclusions = ExclusionIndex::build(exclusions.unwrap_or_else(|e| {
            warn!("Failed to fetch inbound exclusions: {}", e);
            Vec::new()
        }));

        let resolved = resolve(&index, &exclusions, &proxies);
        debug!(
            "Resolved inbounds for {} users from {} proxies",
            resolved.len(),
            proxies.len()
        );
        resolved
    }
}
