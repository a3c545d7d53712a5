//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::os::fd::BorrowedFd;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;

use connscope::config::{ServiceConfig, TlsConfig};
use connscope::probe::dial::{Dialer, ProbeSocket};
use connscope::probe::sockopt::SocketOptionReader;
use connscope::{HttpServer, Prober, Shutdown};

/// A server running on an ephemeral loopback port.
///
/// Dropping it shuts the server down.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start `HttpServer::run` on 127.0.0.1:0 with the given prober.
pub fn start_server(mut config: ServiceConfig, prober: Prober) -> TestServer {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();
    config.timeouts.shutdown_grace_secs = 1;

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let server = HttpServer::with_prober(config, prober);
    tokio::spawn(async move {
        if let Err(e) = server.run(listener, rx).await {
            eprintln!("test server failed: {e}");
        }
    });

    TestServer { addr, shutdown }
}

/// Socket option reader returning fixed values and counting MSS reads.
pub struct FixedSockets {
    mss: Option<u32>,
    mtu: Option<u32>,
    reads: Arc<AtomicUsize>,
}

impl FixedSockets {
    pub fn new(mss: Option<u32>, mtu: Option<u32>) -> Self {
        Self {
            mss,
            mtu,
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn reads(&self) -> Arc<AtomicUsize> {
        self.reads.clone()
    }
}

impl SocketOptionReader for FixedSockets {
    fn max_segment_size(&self, _socket: BorrowedFd<'_>) -> Option<u32> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.mss
    }

    fn path_mtu(&self, _socket: BorrowedFd<'_>) -> Option<u32> {
        self.mtu
    }
}

/// A dialer whose connections never complete.
pub struct PendingDialer;

impl Dialer for PendingDialer {
    fn dial(&self, _addr: SocketAddr) -> BoxFuture<'static, io::Result<ProbeSocket>> {
        Box::pin(std::future::pending::<io::Result<ProbeSocket>>())
    }
}

/// Self-signed certificate for `localhost`, written to a unique temp dir.
pub struct TestCert {
    pub dir: PathBuf,
    pub der: rustls::pki_types::CertificateDer<'static>,
    pub config: TlsConfig,
}

impl Drop for TestCert {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

pub fn self_signed_cert(tag: &str) -> TestCert {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();

    let dir = std::env::temp_dir().join(format!("connscope-{}-{}", tag, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let cert_path = dir.join("cert.pem");
    let key_path = dir.join("key.pem");
    std::fs::write(&cert_path, cert.pem()).unwrap();
    std::fs::write(&key_path, key_pair.serialize_pem()).unwrap();

    TestCert {
        der: cert.der().clone(),
        config: TlsConfig {
            cert_path: cert_path.to_string_lossy().into_owned(),
            key_path: key_path.to_string_lossy().into_owned(),
            ..TlsConfig::default()
        },
        dir,
    }
}

/// Split a raw HTTP/1.1 response into status line, headers and body.
pub fn split_response(raw: &[u8]) -> (String, String, String) {
    let text = String::from_utf8_lossy(raw).into_owned();
    let (head, body) = text.split_once("\r\n\r\n").unwrap_or((&text, ""));
    let (status, headers) = head.split_once("\r\n").unwrap_or((head, ""));
    (status.to_string(), headers.to_ascii_lowercase(), body.to_string())
}
