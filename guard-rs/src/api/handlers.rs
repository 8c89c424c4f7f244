//! API request handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::aggregate::{build_user_responses, ProxySettings, UsersResponse};
use crate::inbound::InboundService;
use crate::store::{AdminScope, GuardStore};

/// Shared state for API handlers
pub struct AppState {
    pub store: GuardStore,
    pub inbounds: InboundService,
    pub api_key: String,
    /// Scope used when a request does not name an administrator
    pub default_scope: AdminScope,
}

impl AppState {
    /// Scope for a request, falling back to the configured default
    pub fn scope_for(&self, admin: Option<String>) -> AdminScope {
        match AdminScope::from(admin) {
            AdminScope::All => self.default_scope.clone(),
            scope => scope,
        }
    }
}

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(msg: &str) -> Self {
        Self {
            error: msg.to_string(),
        }
    }
}

/// Plain message response
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(msg: &str) -> Self {
        Self {
            message: msg.to_string(),
        }
    }
}

/// Query parameters for `GET /api/users`
#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    /// Restrict the listing to users owned by this admin
    pub admin: Option<String>,
}

/// GET / - Liveness message
pub async fn root() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(MessageResponse::new("GuardHelper is running")),
    )
}

/// GET /api/users - Users with their proxies and allowed inbounds
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UsersQuery>,
) -> Result<Json<UsersResponse>, (StatusCode, Json<ApiError>)> {
    let scope = state.scope_for(query.admin);
    info!("Listing users for {:?}", scope);

    let (users, settings, inbounds) = tokio::join!(
        state.store.fetch_users(&scope),
        state.store.fetch_proxy_settings(&scope),
        state.inbounds.resolve(&scope),
    );

    let users = users.map_err(|e| {
        error!("Failed to fetch users: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiError::new("Failed to fetch users")),
        )
    })?;

    let settings = settings.unwrap_or_else(|e| {
        warn!("Failed to fetch proxy settings: {}", e);
        ProxySettings::new()
    });

    let responses = build_user_responses(users, &inbounds, settings);
    Ok(Json(UsersResponse::from(responses)))
}

/// Fallback for unknown routes
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(MessageResponse::new("not found")))
}
