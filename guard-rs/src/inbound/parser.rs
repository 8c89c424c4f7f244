//! Xray configuration parser
//!
//! Reads the inbound list from the live Xray configuration and indexes it
//! by protocol. Tags keep the order in which they first appear in the file.

use std::collections::{BTreeMap, HashSet};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

use super::types::XrayConfig;
use crate::error::{GuardError, Result};

/// Normalized protocol -> unique inbound tags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolIndex {
    protocols: BTreeMap<String, Vec<String>>,
}

impl ProtocolIndex {
    /// Parse and index an in-memory Xray configuration
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let config: XrayConfig = serde_json::from_slice(bytes)
            .map_err(|e| GuardError::MalformedInput(e.to_string()))?;

        let mut protocols: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for inbound in config.inbounds() {
            let Some((protocol, tag)) = inbound.normalized() else {
                continue;
            };

            if !seen.insert((protocol.clone(), tag.clone())) {
                continue;
            }
            protocols.entry(protocol).or_default().push(tag);
        }

        Ok(Self { protocols })
    }

    /// Tags configured for a normalized protocol
    pub fn tags(&self, protocol: &str) -> Option<&[String]> {
        self.protocols.get(protocol).map(Vec::as_slice)
    }

    pub fn protocols(&self) -> impl Iterator<Item = &str> {
        self.protocols.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }
}

/// Read and index the Xray configuration at `path`
pub async fn load_protocol_index(path: &Path) -> Result<ProtocolIndex> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => GuardError::NotFound(path.display().to_string()),
        _ => GuardError::Io(e),
    })?;

    let index = ProtocolIndex::from_slice(&bytes)?;
    if index.is_empty() {
        warn!("No usable inbounds in {}", path.display());
    } else {
        debug!(
            "Loaded {} inbound protocols from {}",
            index.protocols.len(),
            path.display()
        );
    }
    Ok(index)
}
