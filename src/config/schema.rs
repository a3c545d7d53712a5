//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::probe::acquire::AcquisitionStrategy;
use crate::probe::sockopt::DEFAULT_MSS;

/// Root configuration for the connection probe service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Connection probing behaviour.
    pub probe: ProbeConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to certificate chain file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,

    /// Lowest protocol version offered to clients.
    pub min_version: TlsMinVersion,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: "cert.pem".to_string(),
            key_path: "key.pem".to_string(),
            min_version: TlsMinVersion::default(),
        }
    }
}

/// Minimum TLS version policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMinVersion {
    #[default]
    Tls12,
    Tls13,
}

/// Connection probing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// How the raw socket is obtained.
    pub strategy: AcquisitionStrategy,

    /// Port dialed on the client by the side-channel strategy.
    pub side_channel_port: u16,

    /// Side-channel connect deadline in milliseconds.
    pub dial_timeout_ms: u64,

    /// Substitute an estimate when the MSS cannot be read.
    pub mss_fallback: bool,

    /// Estimate used when no MTU is known.
    pub default_mss: u32,

    /// Include the path MTU in reports.
    pub report_mtu: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            strategy: AcquisitionStrategy::Hijack,
            side_channel_port: 443,
            dial_timeout_ms: 3000,
            mss_fallback: false,
            default_mss: DEFAULT_MSS,
            report_mtu: false,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Time allowed for in-flight requests on shutdown, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: ServiceConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert!(config.listener.tls.is_none());
        assert_eq!(config.probe.strategy, AcquisitionStrategy::Hijack);
        assert_eq!(config.probe.dial_timeout_ms, 3000);
        assert!(!config.probe.mss_fallback);
        assert!(!config.probe.report_mtu);
    }

    #[test]
    fn partial_document() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:8443"

            [listener.tls]
            cert_path = "/etc/connscope/cert.pem"
            min_version = "tls13"

            [probe]
            strategy = "side_channel"
            dial_timeout_ms = 500
            "#,
        )
        .unwrap();

        let tls = config.listener.tls.unwrap();
        assert_eq!(tls.cert_path, "/etc/connscope/cert.pem");
        assert_eq!(tls.key_path, "key.pem");
        assert_eq!(tls.min_version, TlsMinVersion::Tls13);
        assert_eq!(config.probe.strategy, AcquisitionStrategy::SideChannel);
        assert_eq!(config.probe.dial_timeout_ms, 500);
        assert_eq!(config.probe.side_channel_port, 443);
    }
}
