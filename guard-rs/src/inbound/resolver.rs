//! Inbound resolution
//!
//! Joins the protocol index from the Xray configuration with the proxies
//! and exclusions from the database. For every user the result maps each
//! protocol the user has a proxy for to the inbound tags that protocol may
//! use.
//!
//! A protocol key is present as soon as the user owns a proxy of that
//! protocol, even when no tag survives (unknown protocol, or every tag
//! excluded). Tag order follows the configuration, with proxies visited in
//! input order.

use std::collections::{HashMap, HashSet};

use super::exclusion::ExclusionIndex;
use super::parser::ProtocolIndex;
use super::types::{Proxy, ResolvedInbounds};

/// Resolve allowed inbound tags per user and protocol
pub fn resolve(
    index: &ProtocolIndex,
    exclusions: &ExclusionIndex,
    proxies: &[Proxy],
) -> ResolvedInbounds {
    let mut resolved = ResolvedInbounds::new();
    let mut recorded: HashMap<(i64, &str), HashSet<&str>> = HashMap::new();

    for proxy in proxies {
        if proxy.protocol.is_empty() {
            continue;
        }

        let allowed = resolved.entry(proxy.user_id, &proxy.protocol);

        let Some(candidates) = index.tags(&proxy.protocol) else {
            continue;
        };

        let seen = recorded
            .entry((proxy.user_id, proxy.protocol.as_str()))
            .or_default();

        for tag in candidates {
            if exclusions.is_excluded(proxy.id, tag) {
                continue;
            }
            if seen.insert(tag.as_str()) {
                allowed.push(tag.clone());
            }
        }
    }

    resolved
}
