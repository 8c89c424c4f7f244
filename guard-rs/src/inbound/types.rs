//! Inbound data model shared by the parser, loaders and resolver

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalize a protocol name (trimmed, lowercase)
pub fn normalize_protocol(protocol: &str) -> String {
    protocol.trim().to_lowercase()
}

/// Inbound entry as it appears in the Xray configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundDescriptor {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
}

impl InboundDescriptor {
    /// Normalized `(protocol, tag)` pair, or `None` if either is blank
    pub fn normalized(&self) -> Option<(String, String)> {
        let protocol = normalize_protocol(self.protocol.as_deref().unwrap_or_default());
        let tag = self.tag.as_deref().unwrap_or_default().trim();

        if protocol.is_empty() || tag.is_empty() {
            return None;
        }

        Some((protocol, tag.to_string()))
    }
}

/// Top-level Xray configuration; everything but the inbound list is ignored
#[derive(Debug, Default, Deserialize)]
pub struct XrayConfig {
    /// `null` list and `null` entries are accepted and treated as absent
    #[serde(default)]
    inbounds: Option<Vec<Option<InboundDescriptor>>>,
}

impl XrayConfig {
    /// Inbound entries present in the document, skipping `null`s
    pub fn inbounds(&self) -> impl Iterator<Item = &InboundDescriptor> {
        self.inbounds.iter().flatten().flatten()
    }
}

/// Proxy record owned by a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    pub id: i64,
    pub user_id: i64,
    /// Normalized protocol; empty means the proxy cannot be resolved
    pub protocol: String,
}

impl Proxy {
    pub fn new(id: i64, user_id: i64, protocol: &str) -> Self {
        Self {
            id,
            user_id,
            protocol: normalize_protocol(protocol),
        }
    }
}

/// "This proxy must never receive this inbound tag"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub proxy_id: i64,
    pub inbound_tag: String,
}

impl Exclusion {
    pub fn new(proxy_id: i64, inbound_tag: impl Into<String>) -> Self {
        Self {
            proxy_id,
            inbound_tag: inbound_tag.into(),
        }
    }
}

/// Allowed tags per protocol for a single user
pub type UserInbounds = BTreeMap<String, Vec<String>>;

/// Allowed tags per user and protocol, produced by one resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedInbounds {
    users: BTreeMap<i64, UserInbounds>,
}

impl ResolvedInbounds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inbounds for a user, if the user has any resolvable proxy
    pub fn get(&self, user_id: i64) -> Option<&UserInbounds> {
        self.users.get(&user_id)
    }

    /// Allowed tags for a user and protocol
    pub fn tags(&self, user_id: i64, protocol: &str) -> Option<&[String]> {
        self.users
            .get(&user_id)
            .and_then(|protocols| protocols.get(protocol))
            .map(Vec::as_slice)
    }

    /// Number of users with at least one resolvable proxy
    pub(crate) fn len(&self) -> usize {
        self.users.len()
    }

    /// Tag list for `(user, protocol)`, created empty if missing
    pub(crate) fn entry(&mut self, user_id: i64, protocol: &str) -> &mut Vec<String> {
        self.users
            .entry(user_id)
            .or_default()
            .entry(protocol.to_string())
            .or_default()
    }
}
