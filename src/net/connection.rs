//! Per-connection transport handle.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Record local/peer addresses and TLS parameters at accept time
//! - Hold the duplicated socket descriptor that a request may hijack
//!
//! # Design Decisions
//! - The handle travels into every request on the connection as an extension
//! - The hijack slot is taken at most once; later takers get `NotHijackable`
//! - A hijacked descriptor is owned by the request and closed when dropped

use std::net::SocketAddr;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use socket2::SockRef;

use crate::probe::error::ProbeError;
use crate::probe::sockopt::is_tcp_socket;
use crate::probe::tls::TlsSession;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Transport facts recorded when a connection was accepted.
///
/// Cheap to clone; all clones share the same hijack slot.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    inner: Arc<HandleInner>,
}

#[derive(Debug)]
struct HandleInner {
    id: ConnectionId,
    local_addr: Option<SocketAddr>,
    peer_addr: Option<SocketAddr>,
    tls: Option<TlsSession>,
    captured: bool,
    socket: Mutex<Option<OwnedFd>>,
}

impl ConnectionHandle {
    /// Create a handle. `socket` is the descriptor a request may later hijack.
    pub fn new(
        local_addr: Option<SocketAddr>,
        peer_addr: Option<SocketAddr>,
        tls: Option<TlsSession>,
        socket: Option<OwnedFd>,
    ) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id: ConnectionId::new(),
                local_addr,
                peer_addr,
                tls,
                captured: socket.is_some(),
                socket: Mutex::new(socket),
            }),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.local_addr
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.inner.peer_addr
    }

    /// TLS parameters, `None` for plain connections.
    pub fn tls_session(&self) -> Option<&TlsSession> {
        self.inner.tls.as_ref()
    }

    /// Take exclusive ownership of the connection's socket.
    pub fn hijack(&self) -> Result<HijackedConnection, ProbeError> {
        if !self.inner.captured {
            return Err(ProbeError::NotHijackable("transport exposes no socket"));
        }

        let fd = self
            .inner
            .socket
            .lock()
            .map_err(|_| ProbeError::NotHijackable("connection slot poisoned"))?
            .take()
            .ok_or(ProbeError::NotHijackable("connection already hijacked"))?;

        if !is_tcp_socket(fd.as_fd()) {
            tracing::warn!(connection_id = %self.inner.id, "Hijacked descriptor is not a TCP socket");
            return Err(ProbeError::NotTcp);
        }

        let sock = SockRef::from(&fd);
        let local_addr = sock
            .local_addr()
            .ok()
            .and_then(|a| a.as_socket())
            .or(self.inner.local_addr);
        let peer_addr = sock
            .peer_addr()
            .ok()
            .and_then(|a| a.as_socket())
            .or(self.inner.peer_addr);

        tracing::debug!(connection_id = %self.inner.id, "Connection hijacked");

        Ok(HijackedConnection {
            id: self.inner.id,
            fd,
            local_addr,
            peer_addr,
        })
    }
}

/// Exclusive, owned access to a connection's TCP socket.
///
/// The descriptor is a duplicate of the one the HTTP layer writes the
/// response on; dropping this closes the duplicate only.
#[derive(Debug)]
pub struct HijackedConnection {
    id: ConnectionId,
    fd: OwnedFd,
    local_addr: Option<SocketAddr>,
    peer_addr: Option<SocketAddr>,
}

impl HijackedConnection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }
}

impl AsFd for HijackedConnection {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl Drop for HijackedConnection {
    fn drop(&mut self) {
        tracing::trace!(connection_id = %self.id, "Hijacked descriptor released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tcp_pair() -> (std::net::TcpStream, std::net::TcpStream) {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let client = std::net::TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn hijack_takes_socket_once() {
        let (_client, server) = tcp_pair();
        let local = server.local_addr().ok();
        let peer = server.peer_addr().ok();
        let fd = server.as_fd().try_clone_to_owned().unwrap();
        let handle = ConnectionHandle::new(local, peer, None, Some(fd));

        let hijacked = handle.clone().hijack().expect("first hijack");
        assert_eq!(hijacked.local_addr(), local);
        assert_eq!(hijacked.peer_addr(), peer);
        assert_eq!(hijacked.id(), handle.id());

        let second = handle.hijack();
        assert!(matches!(second, Err(ProbeError::NotHijackable(_))));
    }

    #[test]
    fn handle_without_socket_is_not_hijackable() {
        let handle = ConnectionHandle::new(None, None, None, None);
        assert!(matches!(handle.hijack(), Err(ProbeError::NotHijackable(_))));
    }

    #[test]
    fn non_tcp_socket_is_rejected() {
        let udp = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        let handle = ConnectionHandle::new(None, None, None, Some(OwnedFd::from(udp)));
        assert!(matches!(handle.hijack(), Err(ProbeError::NotTcp)));
    }

    #[test]
    fn dropping_hijack_keeps_served_socket_open() {
        use std::io::{Read, Write};

        let (mut client, mut server) = tcp_pair();
        let fd = server.as_fd().try_clone_to_owned().unwrap();
        let handle = ConnectionHandle::new(None, None, None, Some(fd));

        drop(handle.hijack().unwrap());

        server.write_all(b"still open").unwrap();
        let mut buf = [0u8; 10];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"still open");
    }
}
