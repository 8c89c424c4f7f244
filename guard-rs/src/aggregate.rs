//! User aggregation
//!
//! Merges user rows, per-proxy settings and resolved inbounds into the
//! records returned by `GET /api/users`.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::inbound::{ResolvedInbounds, UserInbounds};

/// Settings object of a single proxy
pub type SettingsObject = Map<String, Value>;

/// User id -> proxy type -> settings
pub type ProxySettings = BTreeMap<i64, BTreeMap<String, SettingsObject>>;

/// User account row as read from the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub status: String,
    pub created_at: String,
    /// Current traffic plus the traffic recorded at every reset
    pub lifetime_used_traffic: i64,
}

/// User record exposed by the API
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserResponse {
    pub username: String,
    pub status: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub proxies: BTreeMap<String, SettingsObject>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub inbounds: UserInbounds,
    #[serde(rename = "life_time_used_traffic")]
    pub lifetime_used_traffic: i64,
    pub created_at: String,
}

/// `GET /api/users` body
#[derive(Debug, Clone, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserResponse>,
    pub total: usize,
}

impl From<Vec<UserResponse>> for UsersResponse {
    fn from(users: Vec<UserResponse>) -> Self {
        Self {
            total: users.len(),
            users,
        }
    }
}

/// Parse a raw settings column into an object.
///
/// NULL, blank, unparsable or non-object values all become `{}`.
pub fn settings_from_raw(raw: Option<&str>) -> SettingsObject {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return SettingsObject::new();
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(settings)) => settings,
        _ => SettingsObject::new(),
    }
}

/// Build one response record per user row, keeping row order
pub fn build_user_responses(
    users: Vec<UserRow>,
    inbounds: &ResolvedInbounds,
    mut settings: ProxySettings,
) -> Vec<UserResponse> {
    users
        .into_iter()
        .map(|user| UserResponse {
            proxies: settings.remove(&user.id).unwrap_or_default(),
            inbounds: inbounds.get(user.id).cloned().unwrap_or_default(),
            username: user.username,
            status: user.status,
            lifetime_used_traffic: user.lifetime_used_traffic,
            created_at: user.created_at,
        })
        .collect()
}
