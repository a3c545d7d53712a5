//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the metrics exporter when enabled
//! - Bind the listener
//! - Hook OS signals to the shutdown coordinator
//! - Run the server until it drains
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds last (traffic only when ready)

use crate::config::ServiceConfig;
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::net::listener::{self, ListenerError};
use crate::observability::metrics;

/// Errors that abort startup or stop the service.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Run the service described by a validated `config`.
pub async fn run(config: ServiceConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        // Validated already; a parse failure here means the config was
        // built without `validate_config`.
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = listener::bind(&config.listener)?;
    tracing::info!(
        address = ?listener.local_addr().ok(),
        tls = config.listener.tls.is_some(),
        strategy = %config.probe.strategy,
        request_timeout_secs = config.timeouts.request_secs,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    signals::forward_signals(shutdown.clone());

    HttpServer::new(config).run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
