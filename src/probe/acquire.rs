//! Raw connection acquisition strategies.
//!
//! # Strategies
//! - `Hijack`: take the accepted connection's own socket. Authoritative.
//! - `ContextLookup`: addresses recorded by the HTTP layer only. No socket.
//! - `SideChannel`: dial the peer afresh and sample that socket. It never
//!   reflects the MSS negotiated for the request's connection.
//!
//! The strategy is chosen once in configuration and never mixed per request.

use std::fmt;
use std::net::SocketAddr;
use std::os::fd::BorrowedFd;
use std::str::FromStr;
use std::time::Duration;

use axum::http::Version;
use serde::{Deserialize, Serialize};

use crate::net::connection::{ConnectionHandle, HijackedConnection};
use crate::probe::dial::{dial_with_timeout, Dialer, ProbeSocket};
use crate::probe::error::ProbeError;

/// Configured acquisition strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionStrategy {
    #[default]
    Hijack,
    ContextLookup,
    SideChannel,
}

impl AcquisitionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcquisitionStrategy::Hijack => "hijack",
            AcquisitionStrategy::ContextLookup => "context_lookup",
            AcquisitionStrategy::SideChannel => "side_channel",
        }
    }

    /// The report tag produced by this strategy.
    pub fn source(&self) -> MssSource {
        match self {
            AcquisitionStrategy::Hijack => MssSource::Hijacked,
            AcquisitionStrategy::ContextLookup => MssSource::ContextDerived,
            AcquisitionStrategy::SideChannel => MssSource::SideChannelSampled,
        }
    }
}

impl fmt::Display for AcquisitionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AcquisitionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "hijack" => Ok(AcquisitionStrategy::Hijack),
            "context_lookup" | "context" => Ok(AcquisitionStrategy::ContextLookup),
            "side_channel" => Ok(AcquisitionStrategy::SideChannel),
            other => Err(format!("unknown acquisition strategy: {other}")),
        }
    }
}

/// Where a reported MSS came from, and so how far it can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MssSource {
    /// Read from the socket carrying this request.
    Hijacked,
    /// Addresses only; no kernel state for this connection.
    ContextDerived,
    /// Read from a separate, freshly dialed connection.
    SideChannelSampled,
}

impl MssSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MssSource::Hijacked => "hijacked",
            MssSource::ContextDerived => "context_derived",
            MssSource::SideChannelSampled => "side_channel_sampled",
        }
    }
}

/// Owned socket held for the duration of one request.
enum AcquiredSocket {
    Hijacked(HijackedConnection),
    Dialed(ProbeSocket),
}

/// Outcome of the acquisition stage.
///
/// Any socket held here is owned and is closed when the acquisition is dropped.
pub struct Acquisition {
    source: MssSource,
    local_addr: Option<SocketAddr>,
    remote_addr: Option<SocketAddr>,
    socket: Option<AcquiredSocket>,
}

impl Acquisition {
    pub fn source(&self) -> MssSource {
        self.source
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// True when a socket is held that must be released after responding.
    pub fn owns_socket(&self) -> bool {
        self.socket.is_some()
    }

    /// True when the request's own connection was taken over.
    pub fn is_hijacked(&self) -> bool {
        matches!(self.socket, Some(AcquiredSocket::Hijacked(_)))
    }

    /// The socket to sample, if any.
    pub fn socket(&self) -> Option<BorrowedFd<'_>> {
        use std::os::fd::AsFd;

        match self.socket.as_ref()? {
            AcquiredSocket::Hijacked(conn) => Some(conn.as_fd()),
            AcquiredSocket::Dialed(socket) => Some(socket.as_fd()),
        }
    }
}

impl fmt::Debug for Acquisition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Acquisition")
            .field("source", &self.source)
            .field("local_addr", &self.local_addr)
            .field("remote_addr", &self.remote_addr)
            .field("owns_socket", &self.owns_socket())
            .finish()
    }
}

/// Take over the request's own connection.
///
/// HTTP/2 and later multiplex streams over one connection, so no single
/// request may take it; the slot is left untouched.
pub fn acquire_hijacked(
    handle: Option<&ConnectionHandle>,
    version: Version,
) -> Result<Acquisition, ProbeError> {
    if version >= Version::HTTP_2 {
        return Err(ProbeError::NotHijackable("HTTP/2 streams share their connection"));
    }
    let handle = handle.ok_or(ProbeError::NotHijackable("no connection handle"))?;
    let conn = handle.hijack()?;

    Ok(Acquisition {
        source: MssSource::Hijacked,
        local_addr: conn.local_addr(),
        remote_addr: conn.peer_addr(),
        socket: Some(AcquiredSocket::Hijacked(conn)),
    })
}

/// Use only the addresses the HTTP layer recorded for this request.
pub fn acquire_from_context(handle: Option<&ConnectionHandle>, peer: Option<SocketAddr>) -> Acquisition {
    Acquisition {
        source: MssSource::ContextDerived,
        local_addr: handle.and_then(|h| h.local_addr()),
        remote_addr: peer.or_else(|| handle.and_then(|h| h.peer_addr())),
        socket: None,
    }
}

/// Dial the peer on `port` and hold the fresh socket for sampling.
///
/// Dial failures and timeouts are logged and produce an acquisition
/// without a socket; they never abort the request.
pub async fn acquire_side_channel(
    dialer: &dyn Dialer,
    handle: Option<&ConnectionHandle>,
    peer: Option<SocketAddr>,
    port: u16,
    timeout: Duration,
) -> Acquisition {
    let mut acquisition = acquire_from_context(handle, peer);
    acquisition.source = MssSource::SideChannelSampled;

    let Some(remote) = acquisition.remote_addr else {
        tracing::warn!("Side-channel dial skipped: peer address unknown");
        return acquisition;
    };

    let target = SocketAddr::new(remote.ip(), port);
    match dial_with_timeout(dialer, target, timeout).await {
        Ok(socket) => {
            tracing::debug!(target = %target, "Side-channel connection opened");
            acquisition.socket = Some(AcquiredSocket::Dialed(socket));
        }
        Err(e) => {
            tracing::warn!(error = %e, "Side-channel dial failed");
        }
    }

    acquisition
}
