//! API Server - HTTP(S) server for the REST API

use axum::{middleware, routing::get, Router};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnectionBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tower::ServiceExt;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::auth::require_api_key;
use super::handlers::{self, AppState};
use crate::config::GuardConfig;
use crate::error::Result;
use crate::inbound::InboundService;
use crate::store::GuardStore;
use crate::tls::TlsManager;

/// API Server
pub struct ApiServer {
    state: Arc<AppState>,
    addr: String,
    tls_acceptor: Option<TlsAcceptor>,
}

impl ApiServer {
    /// Create a new API server over an existing store
    pub fn new(config: &GuardConfig, store: GuardStore) -> Result<Self> {
        let inbounds = InboundService::new(store.clone(), &config.xray_config_path);

        let state = Arc::new(AppState {
            store,
            inbounds,
            api_key: config.api_key.clone(),
            default_scope: config.default_scope(),
        });

        let tls_acceptor = match (&config.api_ssl_cert_file, &config.api_ssl_key_file) {
            (Some(cert), Some(key)) => Some(TlsManager::new(cert, key).build_acceptor()?),
            _ => None,
        };

        Ok(Self {
            state,
            addr: config.listen_addr.clone(),
            tls_acceptor,
        })
    }

    /// Connect to the configured database and create the server
    pub async fn from_config(config: &GuardConfig) -> Result<Self> {
        let store = GuardStore::connect(
            &config.database_url,
            config.database_max_connections,
            Duration::from_secs(config.database_timeout_seconds),
        )
        .await?;

        if config.database_init_schema {
            info!("Ensuring database schema");
            store.ensure_schema().await?;
        }

        Self::new(config, store)
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Start the API server
    pub async fn run(&self) -> Result<()> {
        info!("Listening on {}", self.addr);
        info!(
            "Reading inbounds from {}",
            self.state.inbounds.xray_config_path().display()
        );

        let listener = TcpListener::bind(&self.addr).await?;

        match self.tls_acceptor.clone() {
            Some(acceptor) => {
                info!("TLS: enabled");
                self.run_tls_server(listener, acceptor).await
            }
            None => {
                info!("TLS: disabled (HTTP only)");
                axum::serve(listener, self.router()).await?;
                Ok(())
            }
        }
    }

    /// Accept TLS connections, one task per connection
    async fn run_tls_server(&self, listener: TcpListener, acceptor: TlsAcceptor) -> Result<()> {
        let router = self.router();

        loop {
            let (stream, peer) = listener.accept().await?;
            tokio::spawn(serve_tls_connection(
                acceptor.clone(),
                router.clone(),
                stream,
                peer,
            ));
        }
    }
}

/// Complete the TLS handshake and serve HTTP/1 or HTTP/2 over the stream
async fn serve_tls_connection(
    acceptor: TlsAcceptor,
    router: Router,
    stream: TcpStream,
    peer: SocketAddr,
) {
    let tls_stream = match acceptor.accept(stream).await {
        Ok(tls_stream) => tls_stream,
        Err(e) => {
            warn!("TLS handshake with {} failed: {}", peer, e);
            return;
        }
    };

    let service = service_fn(move |req| router.clone().oneshot(req));
    let builder = ConnectionBuilder::new(TokioExecutor::new());

    if let Err(e) = builder.serve_connection(TokioIo::new(tls_stream), service).await {
        error!("Connection from {} closed with error: {}", peer, e);
    }
}

/// Router over an explicit state, used by the server and by tests
pub fn build_router(state: Arc<AppState>) -> Router {
    let protected_routes = Router::new()
        .route("/api/users", get(handlers::list_users))
        .route("/api/users/", get(handlers::list_users))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .merge(protected_routes)
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
