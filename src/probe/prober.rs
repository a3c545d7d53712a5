//! Acquisition and extraction for a single request.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Version;

use crate::config::ProbeConfig;
use crate::net::connection::ConnectionHandle;
use crate::probe::acquire::{
    acquire_from_context, acquire_hijacked, acquire_side_channel, Acquisition, AcquisitionStrategy,
};
use crate::probe::dial::{Dialer, TokioDialer};
use crate::probe::error::ProbeError;
use crate::probe::sockopt::{KernelSockets, MssFallback, MssReading, SocketOptionReader};

/// Runs the configured acquisition strategy and reads socket options.
///
/// Shared read-only across all requests.
pub struct Prober {
    strategy: AcquisitionStrategy,
    side_channel_port: u16,
    dial_timeout: Duration,
    fallback: MssFallback,
    report_mtu: bool,
    sockets: Arc<dyn SocketOptionReader>,
    dialer: Arc<dyn Dialer>,
}

impl Prober {
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            strategy: config.strategy,
            side_channel_port: config.side_channel_port,
            dial_timeout: Duration::from_millis(config.dial_timeout_ms),
            fallback: MssFallback {
                enabled: config.mss_fallback,
                default_mss: config.default_mss,
            },
            report_mtu: config.report_mtu,
            sockets: Arc::new(KernelSockets),
            dialer: Arc::new(TokioDialer),
        }
    }

    /// Replace the socket option source.
    pub fn with_socket_reader(mut self, sockets: Arc<dyn SocketOptionReader>) -> Self {
        self.sockets = sockets;
        self
    }

    /// Replace the side-channel dialer.
    pub fn with_dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = dialer;
        self
    }

    pub fn strategy(&self) -> AcquisitionStrategy {
        self.strategy
    }

    pub fn dial_timeout(&self) -> Duration {
        self.dial_timeout
    }

    /// Acquiring stage.
    ///
    /// Only the hijack strategy can fail; the others degrade instead.
    pub async fn acquire(
        &self,
        handle: Option<&ConnectionHandle>,
        peer: Option<SocketAddr>,
        version: Version,
    ) -> Result<Acquisition, ProbeError> {
        match self.strategy {
            AcquisitionStrategy::Hijack => acquire_hijacked(handle, version),
            AcquisitionStrategy::ContextLookup => Ok(acquire_from_context(handle, peer)),
            AcquisitionStrategy::SideChannel => Ok(acquire_side_channel(
                self.dialer.as_ref(),
                handle,
                peer,
                self.side_channel_port,
                self.dial_timeout,
            )
            .await),
        }
    }

    /// MSS half of the extracting stage.
    pub fn extract(&self, acquisition: &Acquisition) -> MssReading {
        let Some(socket) = acquisition.socket() else {
            return self.fallback.resolve(None, None);
        };

        let raw = self.sockets.max_segment_size(socket);
        let mtu = if self.report_mtu || (self.fallback.enabled && raw.is_none()) {
            self.sockets.path_mtu(socket)
        } else {
            None
        };

        let reading = self.fallback.resolve(raw, mtu);
        if raw.is_none() {
            tracing::warn!(
                source = acquisition.source().as_str(),
                mss = reading.value(),
                status = ?reading.origin(),
                "MSS not readable from socket"
            );
        }
        reading
    }
}

impl std::fmt::Debug for Prober {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prober")
            .field("strategy", &self.strategy)
            .field("side_channel_port", &self.side_channel_port)
            .field("dial_timeout", &self.dial_timeout)
            .field("fallback", &self.fallback)
            .field("report_mtu", &self.report_mtu)
            .finish_non_exhaustive()
    }
}
