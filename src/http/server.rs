//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the diagnostic handler on every path
//! - Wire up middleware (timeout, request ID, tracing)
//! - Serve plain or TLS connections through [`IntrospectAcceptor`]
//! - Drain connections on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::any, Router};
use axum_server::{accept::DefaultAcceptor, tls_rustls::RustlsAcceptor, Handle};
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::http::handler::diagnose;
use crate::http::request::UuidRequestId;
use crate::lifecycle::shutdown::drain_on_shutdown;
use crate::net::tls::{load_tls_config, TlsSetupError};
use crate::net::IntrospectAcceptor;
use crate::probe::{AcquisitionStrategy, Prober};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub prober: Arc<Prober>,
}

/// Errors that stop the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Tls(#[from] TlsSetupError),
}

/// HTTP server for the diagnostic endpoint.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
    prober: Arc<Prober>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServiceConfig) -> Self {
        let prober = Prober::new(&config.probe);
        Self::with_prober(config, prober)
    }

    /// Create a server around an already configured prober.
    pub fn with_prober(config: ServiceConfig, prober: Prober) -> Self {
        let prober = Arc::new(prober);
        let state = AppState {
            prober: prober.clone(),
        };
        let router = Self::build_router(&config, state);

        Self {
            router,
            config,
            prober,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(diagnose))
            .route("/", any(diagnose))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: std::net::TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        let capture_socket = self.prober.strategy() == AcquisitionStrategy::Hijack;

        let handle = Handle::new();
        drain_on_shutdown(
            handle.clone(),
            shutdown,
            Duration::from_secs(self.config.timeouts.shutdown_grace_secs),
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        match &self.config.listener.tls {
            Some(tls) => {
                let rustls = load_tls_config(tls, !capture_socket)?;
                tracing::info!(
                    address = %addr,
                    strategy = %self.prober.strategy(),
                    min_version = ?tls.min_version,
                    "HTTPS server starting"
                );
                axum_server::from_tcp(listener)
                    .acceptor(IntrospectAcceptor::new(
                        RustlsAcceptor::new(rustls),
                        capture_socket,
                    ))
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
            None => {
                tracing::info!(
                    address = %addr,
                    strategy = %self.prober.strategy(),
                    "HTTP server starting"
                );
                axum_server::from_tcp(listener)
                    .acceptor(IntrospectAcceptor::new(DefaultAcceptor::new(), capture_socket))
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
