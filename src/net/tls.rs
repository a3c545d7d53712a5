//! TLS configuration and certificate loading.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::version::{TLS12, TLS13};
use rustls::{ServerConfig, SupportedProtocolVersion};
use thiserror::Error;

use crate::config::{TlsConfig, TlsMinVersion};

/// Errors raised while preparing the TLS listener.
#[derive(Debug, Error)]
pub enum TlsSetupError {
    #[error("Certificate file not found: {0:?}")]
    CertificateNotFound(std::path::PathBuf),

    #[error("Private key file not found: {0:?}")]
    KeyNotFound(std::path::PathBuf),

    #[error("Failed to read PEM file: {0}")]
    Io(#[from] std::io::Error),

    #[error("No certificates found in {0:?}")]
    NoCertificates(std::path::PathBuf),

    #[error("No private key found in {0:?}")]
    NoPrivateKey(std::path::PathBuf),

    #[error("Invalid TLS configuration: {0}")]
    Rustls(#[from] rustls::Error),
}

static TLS12_AND_UP: &[&SupportedProtocolVersion] = &[&TLS13, &TLS12];
static TLS13_ONLY: &[&SupportedProtocolVersion] = &[&TLS13];

fn protocol_versions(min: TlsMinVersion) -> &'static [&'static SupportedProtocolVersion] {
    match min {
        TlsMinVersion::Tls12 => TLS12_AND_UP,
        TlsMinVersion::Tls13 => TLS13_ONLY,
    }
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TlsSetupError> {
    let mut reader = BufReader::new(File::open(path)?);
    let certs = rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(TlsSetupError::NoCertificates(path.to_path_buf()));
    }
    Ok(certs)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, TlsSetupError> {
    let mut reader = BufReader::new(File::open(path)?);
    rustls_pemfile::private_key(&mut reader)?
        .ok_or_else(|| TlsSetupError::NoPrivateKey(path.to_path_buf()))
}

/// Build a rustls server config from PEM files.
///
/// `offer_h2` adds `h2` to ALPN. Hijacking servers leave it out so every
/// TLS client speaks HTTP/1.1 and owns its connection.
pub fn build_server_config(config: &TlsConfig, offer_h2: bool) -> Result<ServerConfig, TlsSetupError> {
    let cert_path = Path::new(&config.cert_path);
    let key_path = Path::new(&config.key_path);

    if !cert_path.exists() {
        return Err(TlsSetupError::CertificateNotFound(cert_path.to_path_buf()));
    }
    if !key_path.exists() {
        return Err(TlsSetupError::KeyNotFound(key_path.to_path_buf()));
    }

    let certs = load_certs(cert_path)?;
    let key = load_key(key_path)?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut server_config = ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(protocol_versions(config.min_version))?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;
    server_config.alpn_protocols = if offer_h2 {
        vec![b"h2".to_vec(), b"http/1.1".to_vec()]
    } else {
        vec![b"http/1.1".to_vec()]
    };

    Ok(server_config)
}

/// Load TLS configuration from certificate and key files.
pub fn load_tls_config(config: &TlsConfig, offer_h2: bool) -> Result<RustlsConfig, TlsSetupError> {
    let server_config = build_server_config(config, offer_h2)?;

    tracing::info!(
        cert_path = %config.cert_path,
        min_version = ?config.min_version,
        offer_h2,
        "TLS configuration loaded"
    );

    Ok(RustlsConfig::from_config(Arc::new(server_config)))
}
