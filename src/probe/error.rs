//! Errors that abort a probe before a report is built.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Acquisition failures.
///
/// Degraded outcomes (unreadable MSS, missing TLS, failed side-channel dial)
/// are not errors; they show up as sentinel values in the report.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The transport cannot hand over exclusive access to its socket.
    #[error("Hijacking not supported: {0}")]
    NotHijackable(&'static str),

    /// The hijacked descriptor is not a TCP socket.
    #[error("Not a TCP connection")]
    NotTcp,
}

impl ProbeError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::NotHijackable(_) => "not_hijackable",
            ProbeError::NotTcp => "not_tcp",
        }
    }
}

impl IntoResponse for ProbeError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
