//! Integration tests for the users API

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use guard_rs::api::{build_router, AppState};
use guard_rs::inbound::InboundService;
use guard_rs::{AdminScope, GuardStore};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tower::ServiceExt;

const API_KEY: &str = "test-key";

const XRAY_CONFIG: &str = r#"{
    "inbounds": [
        {"tag": "VMESS_TCP", "protocol": "VMess", "port": 2053},
        {"tag": "VLESS_A", "protocol": "vless"},
        {"tag": "VLESS_B", "protocol": "vless"},
        {"tag": "TROJAN_WS", "protocol": "trojan"}
    ]
}"#;

/// Helper to create an in-memory panel database for testing
async fn setup_store() -> GuardStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let store = GuardStore::from_pool(pool);
    store.ensure_schema().await.unwrap();

    let seed = [
        "INSERT INTO admins (id, username) VALUES (1, 'alice'), (2, 'bob')",
        "INSERT INTO users (id, username, status, used_traffic, created_at, admin_id) VALUES
            (7, 'user7', 'active', 100, '2024-01-01 10:00:00', 1),
            (8, 'user8', 'limited', 50, '2024-01-02 10:00:00', 1),
            (9, 'user9', 'active', 0, '2024-01-03 10:00:00', 2)",
        "INSERT INTO user_usage_logs (user_id, used_traffic_at_reset) VALUES (7, 900)",
        "INSERT INTO proxies (id, user_id, type, settings) VALUES
            (1, 7, 'VMess', '{\"id\": \"uuid-7\"}'),
            (2, 8, 'vless', '{\"id\": \"uuid-8a\", \"flow\": \"\"}'),
            (3, 8, 'VLESS', '{broken'),
            (4, 9, 'trojan', '{\"password\": \"pw\"}')",
        "INSERT INTO exclude_inbounds_association (proxy_id, inbound_tag) VALUES
            (2, 'VLESS_A'), (3, 'VLESS_A'), (4, 'TROJAN_WS')",
    ];
    for statement in seed {
        sqlx::query(statement).execute(store.pool()).await.unwrap();
    }

    store
}

fn write_xray_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn app(store: GuardStore, xray_config: &Path, default_scope: AdminScope) -> Router {
    let state = Arc::new(AppState {
        inbounds: InboundService::new(store.clone(), xray_config),
        store,
        api_key: API_KEY.to_string(),
        default_scope,
    });
    build_router(state)
}

async fn get(app: Router, uri: &str, api_key: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().uri(uri);
    if let Some(key) = api_key {
        request = request.header("X-API-KEY", key);
    }

    let response = app
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_root_message() {
    let config = write_xray_config(XRAY_CONFIG);
    let app = app(setup_store().await, config.path(), AdminScope::All);

    let (status, body) = get(app, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "GuardHelper is running"}));
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let config = write_xray_config(XRAY_CONFIG);
    let app = app(setup_store().await, config.path(), AdminScope::All);

    let (status, body) = get(app, "/api/nothing", Some(API_KEY)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"message": "not found"}));
}

#[tokio::test]
async fn test_users_requires_api_key() {
    let config = write_xray_config(XRAY_CONFIG);
    let store = setup_store().await;

    let (status, body) = get(
        app(store.clone(), config.path(), AdminScope::All),
        "/api/users",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": "Unauthorized"}));

    let (status, _) = get(
        app(store, config.path(), AdminScope::All),
        "/api/users",
        Some("wrong-key"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_users_full_response() {
    let config = write_xray_config(XRAY_CONFIG);
    let app = app(setup_store().await, config.path(), AdminScope::All);

    let (status, body) = get(app, "/api/users", Some(API_KEY)).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(
        body,
        json!({
            "users": [
                {
                    "username": "user7",
                    "status": "active",
                    "proxies": {"vmess": {"id": "uuid-7"}},
                    "inbounds": {"vmess": ["VMESS_TCP"]},
                    "life_time_used_traffic": 1000,
                    "created_at": "2024-01-01 10:00:00"
                },
                {
                    "username": "user8",
                    "status": "limited",
                    "proxies": {"vless": {}},
                    "inbounds": {"vless": ["VLESS_B"]},
                    "life_time_used_traffic": 50,
                    "created_at": "2024-01-02 10:00:00"
                },
                {
                    "username": "user9",
                    "status": "active",
                    "proxies": {"trojan": {"password": "pw"}},
                    "inbounds": {"trojan": []},
                    "life_time_used_traffic": 0,
                    "created_at": "2024-01-03 10:00:00"
                }
            ],
            "total": 3
        })
    );
}

#[tokio::test]
async fn test_admin_scope_from_query() {
    let config = write_xray_config(XRAY_CONFIG);
    let app = app(setup_store().await, config.path(), AdminScope::All);

    let (status, body) = get(app, "/api/users?admin=bob", Some(API_KEY)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["users"][0]["username"], "user9");
}

#[tokio::test]
async fn test_default_admin_scope() {
    let config = write_xray_config(XRAY_CONFIG);
    let app = app(
        setup_store().await,
        config.path(),
        AdminScope::Admin("alice".to_string()),
    );

    let (_, body) = get(app, "/api/users", Some(API_KEY)).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["users"][0]["username"], "user7");
    assert_eq!(body["users"][1]["username"], "user8");
}

#[tokio::test]
async fn test_missing_xray_config_degrades_to_empty_inbounds() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("config.json");
    let app = app(setup_store().await, &missing, AdminScope::All);

    let (status, body) = get(app, "/api/users", Some(API_KEY)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["users"][0]["inbounds"], json!({"vmess": []}));
    assert_eq!(body["users"][0]["proxies"]["vmess"]["id"], "uuid-7");
}

#[tokio::test]
async fn test_config_is_read_on_every_request() {
    let mut config = write_xray_config(r#"{"inbounds": []}"#);
    let store = setup_store().await;

    let (_, body) = get(
        app(store.clone(), config.path(), AdminScope::All),
        "/api/users",
        Some(API_KEY),
    )
    .await;
    assert_eq!(body["users"][0]["inbounds"], json!({"vmess": []}));

    config.as_file_mut().set_len(0).unwrap();
    std::fs::write(config.path(), XRAY_CONFIG).unwrap();

    let (_, body) = get(
        app(store, config.path(), AdminScope::All),
        "/api/users",
        Some(API_KEY),
    )
    .await;
    assert_eq!(body["users"][0]["inbounds"], json!({"vmess": ["VMESS_TCP"]}));
}

#[tokio::test]
async fn test_user_query_failure_is_500() {
    let config = write_xray_config(XRAY_CONFIG);
    let store = setup_store().await;
    sqlx::query("DROP TABLE user_usage_logs")
        .execute(store.pool())
        .await
        .unwrap();
    let app = app(store, config.path(), AdminScope::All);

    let (status, body) = get(app, "/api/users", Some(API_KEY)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Failed to fetch users"}));
}

#[tokio::test]
async fn test_response_is_idempotent() {
    let config = write_xray_config(XRAY_CONFIG);
    let store = setup_store().await;

    let (_, first) = get(
        app(store.clone(), config.path(), AdminScope::All),
        "/api/users",
        Some(API_KEY),
    )
    .await;
    let (_, second) = get(
        app(store, config.path(), AdminScope::All),
        "/api/users",
        Some(API_KEY),
    )
    .await;

    assert_eq!(first.to_string(), second.to_string());
}
