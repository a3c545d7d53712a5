//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{ServiceConfig, TlsConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Port used when `PORT` is not set.
pub const DEFAULT_PORT: &str = "8080";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, message: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, message } => write!(f, "Invalid {}: {}", var, message),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply `PORT`, `TLS_CERT_FILE`, `TLS_KEY_FILE` and `PROBE_STRATEGY`.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT").filter(|p| !p.is_empty()) {
        let port: u16 = port.parse().map_err(|_| ConfigError::Env {
            var: "PORT",
            message: format!("{port:?} is not a port number"),
        })?;
        config.listener.bind_address = format!("0.0.0.0:{port}");
    }

    let cert = lookup("TLS_CERT_FILE").filter(|p| !p.is_empty());
    let key = lookup("TLS_KEY_FILE").filter(|p| !p.is_empty());
    if cert.is_some() || key.is_some() {
        let tls = config.listener.tls.get_or_insert_with(TlsConfig::default);
        if let Some(cert) = cert {
            tls.cert_path = cert;
        }
        if let Some(key) = key {
            tls.key_path = key;
        }
    }

    if let Some(strategy) = lookup("PROBE_STRATEGY").filter(|s| !s.is_empty()) {
        config.probe.strategy = strategy.parse().map_err(|message| ConfigError::Env {
            var: "PROBE_STRATEGY",
            message,
        })?;
    }

    Ok(())
}
