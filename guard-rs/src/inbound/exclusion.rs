//! Per-proxy inbound exclusions

use std::collections::{HashMap, HashSet};

use super::types::Exclusion;

/// Proxy id -> excluded inbound tags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionIndex {
    by_proxy: HashMap<i64, HashSet<String>>,
}

impl ExclusionIndex {
    /// Group exclusion rows by proxy
    pub fn build<I>(exclusions: I) -> Self
    where
        I: IntoIterator<Item = Exclusion>,
    {
        let mut by_proxy: HashMap<i64, HashSet<String>> = HashMap::new();

        for exclusion in exclusions {
            let tag = exclusion.inbound_tag.trim();
            if tag.is_empty() {
                continue;
            }
            by_proxy
                .entry(exclusion.proxy_id)
                .or_default()
                .insert(tag.to_string());
        }

        Self { by_proxy }
    }

    /// Whether `tag` is excluded for `proxy_id`
    pub fn is_excluded(&self, proxy_id: i64, tag: &str) -> bool {
        self.by_proxy
            .get(&proxy_id)
            .is_some_and(|tags| tags.contains(tag))
    }
}
