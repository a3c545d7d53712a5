//! TCP listener bootstrap.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Hand a non-blocking std listener to the HTTP server
//!
//! # Design Decisions
//! - Bind errors are fatal at startup
//! - Address parsing errors are reported as bind errors

use std::net::{SocketAddr, TcpListener};

use thiserror::Error;

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Configured address does not parse.
    #[error("Invalid bind address {address:?}: {source}")]
    Address {
        address: String,
        source: std::net::AddrParseError,
    },

    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    Bind(#[from] std::io::Error),
}

/// Bind the listener described by `config`.
pub fn bind(config: &ListenerConfig) -> Result<TcpListener, ListenerError> {
    let addr: SocketAddr = config
        .bind_address
        .parse()
        .map_err(|source| ListenerError::Address {
            address: config.bind_address.clone(),
            source,
        })?;

    let listener = TcpListener::bind(addr)?;
    listener.set_nonblocking(true)?;

    tracing::info!(
        address = %listener.local_addr()?,
        tls = config.tls.is_some(),
        "Listener bound"
    );

    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_ephemeral_port() {
        let config = ListenerConfig {
            bind_address: "127.0.0.1:0".into(),
            tls: None,
        };
        let listener = bind(&config).unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[test]
    fn bad_address_is_rejected() {
        let config = ListenerConfig {
            bind_address: "not an address".into(),
            tls: None,
        };
        assert!(matches!(bind(&config), Err(ListenerError::Address { .. })));
    }
}
