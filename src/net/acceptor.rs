//! Connection acceptor that records transport facts.
//!
//! Wraps an axum-server acceptor (plain or rustls). Once the inner acceptor
//! has produced its stream, the TCP socket and TLS parameters are captured
//! into a [`ConnectionHandle`] which is attached to every request served on
//! that connection.

use std::io;
use std::os::fd::{AsFd, BorrowedFd};

use axum::{middleware::AddExtension, Extension};
use axum_server::accept::Accept;
use futures_util::future::BoxFuture;
use tokio::net::TcpStream;
use tokio_rustls::server::TlsStream;
use tower::Layer;

use crate::net::connection::ConnectionHandle;
use crate::probe::tls::TlsSession;

/// Access to the socket and TLS state underneath an accepted stream.
pub trait TransportFacts {
    fn tcp_stream(&self) -> &TcpStream;

    fn tls_session(&self) -> Option<TlsSession> {
        None
    }

    fn socket(&self) -> BorrowedFd<'_> {
        self.tcp_stream().as_fd()
    }
}

impl TransportFacts for TcpStream {
    fn tcp_stream(&self) -> &TcpStream {
        self
    }
}

impl TransportFacts for TlsStream<TcpStream> {
    fn tcp_stream(&self) -> &TcpStream {
        self.get_ref().0
    }

    fn tls_session(&self) -> Option<TlsSession> {
        Some(TlsSession::from_connection(self.get_ref().1))
    }
}

/// Build the handle for a freshly accepted stream.
///
/// With `capture_socket` the descriptor is duplicated so a request can
/// hijack it; a failed duplication leaves the connection non-hijackable.
pub fn capture<T: TransportFacts>(stream: &T, capture_socket: bool) -> ConnectionHandle {
    let tcp = stream.tcp_stream();
    let socket = if capture_socket {
        match stream.socket().try_clone_to_owned() {
            Ok(fd) => Some(fd),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to duplicate accepted socket");
                None
            }
        }
    } else {
        None
    };

    let handle = ConnectionHandle::new(
        tcp.local_addr().ok(),
        tcp.peer_addr().ok(),
        stream.tls_session(),
        socket,
    );

    tracing::debug!(
        connection_id = %handle.id(),
        peer_addr = ?handle.peer_addr(),
        tls = handle.tls_session().is_some(),
        "Connection accepted"
    );

    handle
}

/// Acceptor that attaches a [`ConnectionHandle`] to each connection.
#[derive(Debug, Clone)]
pub struct IntrospectAcceptor<A> {
    inner: A,
    capture_socket: bool,
}

impl<A> IntrospectAcceptor<A> {
    pub fn new(inner: A, capture_socket: bool) -> Self {
        Self {
            inner,
            capture_socket,
        }
    }
}

impl<A, S> Accept<TcpStream, S> for IntrospectAcceptor<A>
where
    A: Accept<TcpStream, S> + Clone + Send + Sync + 'static,
    A::Stream: TransportFacts + Send + 'static,
    A::Service: Send + 'static,
    A::Future: Send + 'static,
    S: Send + 'static,
{
    type Stream = A::Stream;
    type Service = AddExtension<A::Service, ConnectionHandle>;
    type Future = BoxFuture<'static, io::Result<(Self::Stream, Self::Service)>>;

    fn accept(&self, stream: TcpStream, service: S) -> Self::Future {
        let inner = self.inner.clone();
        let capture_socket = self.capture_socket;

        Box::pin(async move {
            let (stream, service) = inner.accept(stream, service).await?;
            let handle = capture(&stream, capture_socket);
            Ok((stream, Extension(handle).layer(service)))
        })
    }
}
