//! Read-only access to the panel database
//!
//! Every query is filtered by an [`AdminScope`] the same way: through the
//! owning user's admin. The tables belong to the panel; this module never
//! writes to them outside of [`GuardStore::ensure_schema`].

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::aggregate::{settings_from_raw, ProxySettings, UserRow};
use crate::error::Result;
use crate::inbound::{Exclusion, Proxy};

/// Subset of users visible to an administrator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AdminScope {
    /// Every user, regardless of owning admin
    #[default]
    All,
    /// Users owned by the admin with this username
    Admin(String),
}

impl AdminScope {
    /// Username to bind into scoped queries (`NULL` means unscoped)
    fn username(&self) -> Option<&str> {
        match self {
            AdminScope::All => None,
            AdminScope::Admin(username) => Some(username.as_str()),
        }
    }
}

impl From<Option<String>> for AdminScope {
    fn from(username: Option<String>) -> Self {
        match username {
            Some(username) if !username.trim().is_empty() => {
                AdminScope::Admin(username.trim().to_string())
            }
            _ => AdminScope::All,
        }
    }
}

/// Database handle for user, proxy and exclusion reads
#[derive(Clone)]
pub struct GuardStore {
    db: SqlitePool,
}

impl GuardStore {
    /// Connect a pool to `database_url`
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let db = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;

        info!("Database connection established");
        Ok(Self { db })
    }

    /// Wrap an existing pool
    pub fn from_pool(db: SqlitePool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    /// Create the panel tables if they are missing.
    ///
    /// Only meant for development and test databases; a production panel
    /// database already has them.
    pub async fn ensure_schema(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS admins (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                status TEXT NOT NULL DEFAULT 'active',
                used_traffic INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                admin_id INTEGER REFERENCES admins(id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS user_usage_logs (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                used_traffic_at_reset INTEGER NOT NULL DEFAULT 0,
                reset_at TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS proxies (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id),
                type TEXT NOT NULL,
                settings TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS exclude_inbounds_association (
                proxy_id INTEGER NOT NULL REFERENCES proxies(id),
                inbound_tag TEXT NOT NULL
            )
            "#,
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.db).await?;
        }

        Ok(())
    }

    /// Users with their lifetime traffic (current period plus all resets)
    pub async fn fetch_users(&self, scope: &AdminScope) -> Result<Vec<UserRow>> {
        let rows = sqlx::query_as::<_, (i64, String, String, String, i64)>(
            r#"
            SELECT
                u.id,
                u.username,
                CAST(u.status AS TEXT),
                CAST(u.created_at AS TEXT),
                COALESCE(u.used_traffic, 0) + COALESCE(SUM(l.used_traffic_at_reset), 0)
            FROM users u
            LEFT JOIN admins a ON a.id = u.admin_id
            LEFT JOIN user_usage_logs l ON l.user_id = u.id
            WHERE (? IS NULL OR a.username = ?)
            GROUP BY u.id, u.username, u.status, u.created_at, u.used_traffic
            ORDER BY u.id
            "#,
        )
        .bind(scope.username())
        .bind(scope.username())
        .fetch_all(&self.db)
        .await?;

        debug!("Fetched {} users for {:?}", rows.len(), scope);

        Ok(rows
            .into_iter()
            .map(|(id, username, status, created_at, lifetime_used_traffic)| UserRow {
                id,
                username,
                status,
                created_at,
                lifetime_used_traffic,
            })
            .collect())
    }

    /// Proxies in id order, protocol normalized
    pub async fn fetch_proxies(&self, scope: &AdminScope) -> Result<Vec<Proxy>> {
        let rows = sqlx::query_as::<_, (i64, i64, Option<String>)>(
            r#"
            SELECT p.id, p.user_id, CAST(p.type AS TEXT)
            FROM proxies p
            JOIN users u ON u.id = p.user_id
            LEFT JOIN admins a ON a.id = u.admin_id
            WHERE (? IS NULL OR a.username = ?)
            ORDER BY p.id
            "#,
        )
        .bind(scope.username())
        .bind(scope.username())
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, user_id, protocol)| {
                Proxy::new(id, user_id, protocol.as_deref().unwrap_or_default())
            })
            .collect())
    }

    /// Inbound exclusions of the proxies in scope
    pub async fn fetch_exclusions(&self, scope: &AdminScope) -> Result<Vec<Exclusion>> {
        let rows = sqlx::query_as::<_, (i64, String)>(
            r#"
            SELECT e.proxy_id, CAST(e.inbound_tag AS TEXT)
            FROM exclude_inbounds_association e
            JOIN proxies p ON p.id = e.proxy_id
            JOIN users u ON u.id = p.user_id
            LEFT JOIN admins a ON a.id = u.admin_id
            WHERE (? IS NULL OR a.username = ?)
            "#,
        )
        .bind(scope.username())
        .bind(scope.username())
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(proxy_id, inbound_tag)| Exclusion::new(proxy_id, inbound_tag))
            .collect())
    }

    /// Proxy settings per user and lowercased proxy type
    pub async fn fetch_proxy_settings(&self, scope: &AdminScope) -> Result<ProxySettings> {
        let rows = sqlx::query_as::<_, (i64, String, Option<String>)>(
            r#"
            SELECT p.user_id, COALESCE(LOWER(TRIM(p.type)), ''), CAST(p.settings AS TEXT)
            FROM proxies p
            JOIN users u ON u.id = p.user_id
            LEFT JOIN admins a ON a.id = u.admin_id
            WHERE (? IS NULL OR a.username = ?)
            ORDER BY p.id
            "#,
        )
        .bind(scope.username())
        .bind(scope.username())
        .fetch_all(&self.db)
        .await?;

        let mut settings = ProxySettings::new();
        for (user_id, proxy_type, raw) in rows {
            if proxy_type.is_empty() {
                continue;
            }
            settings
                .entry(user_id)
                .or_insert_with(BTreeMap::new)
                .insert(proxy_type, settings_from_raw(raw.as_deref()));
        }

        Ok(settings)
    }
}
