//! Side-channel dialing.
//!
//! Opens a fresh TCP connection purely to sample socket options from it.
//! The dialed socket is returned as an owned, boxed descriptor so that
//! dropping it closes the connection on every exit path.

use std::io;
use std::net::SocketAddr;
use std::os::fd::AsFd;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::net::TcpStream;

/// An owned socket sampled by the prober. Dropping it closes the socket.
pub type ProbeSocket = Box<dyn AsFd + Send + Sync>;

/// Opens side-channel connections.
pub trait Dialer: Send + Sync {
    fn dial(&self, addr: SocketAddr) -> BoxFuture<'static, io::Result<ProbeSocket>>;
}

/// Dials with tokio's TCP connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDialer;

impl Dialer for TokioDialer {
    fn dial(&self, addr: SocketAddr) -> BoxFuture<'static, io::Result<ProbeSocket>> {
        Box::pin(async move {
            let stream = TcpStream::connect(addr).await?;
            Ok(Box::new(stream) as ProbeSocket)
        })
    }
}

/// Why a side-channel dial produced no socket.
#[derive(Debug, thiserror::Error)]
pub enum DialFailure {
    #[error("dial to {addr} timed out after {timeout:?}")]
    Timeout { addr: SocketAddr, timeout: Duration },

    #[error("dial to {addr} failed: {source}")]
    Io {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Dial `addr` with a hard deadline.
///
/// On timeout the in-flight dial future is dropped, which closes any socket
/// it had already opened.
pub async fn dial_with_timeout(
    dialer: &dyn Dialer,
    addr: SocketAddr,
    timeout: Duration,
) -> Result<ProbeSocket, DialFailure> {
    match tokio::time::timeout(timeout, dialer.dial(addr)).await {
        Ok(Ok(socket)) => Ok(socket),
        Ok(Err(source)) => Err(DialFailure::Io { addr, source }),
        Err(_) => Err(DialFailure::Timeout { addr, timeout }),
    }
}
