//! Connection report assembly.
//!
//! Pure aggregation of the acquisition, MSS reading, TLS inspection and
//! request metadata into the record serialized back to the client.

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};

use axum::http::{HeaderMap, Request};
use serde::Serialize;

use crate::probe::acquire::{Acquisition, MssSource};
use crate::probe::sockopt::{MssOrigin, MssReading};
use crate::probe::tls::{TlsInspection, TlsVersion};

/// Request-level fields copied into the report.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    /// Host as sent by the client (Host header or URI authority).
    pub host: String,
    /// Peer address as recorded by the HTTP layer, unparsed.
    pub peer: String,
    pub headers: BTreeMap<String, Vec<String>>,
}

impl RequestMeta {
    pub fn from_request<B>(request: &Request<B>, peer: Option<SocketAddr>) -> Self {
        let host = request
            .headers()
            .get(axum::http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| request.uri().authority().map(|a| a.to_string()))
            .unwrap_or_default();

        Self {
            host,
            peer: peer.map(|p| p.to_string()).unwrap_or_default(),
            headers: header_dump(request.headers()),
        }
    }
}

fn header_dump(headers: &HeaderMap) -> BTreeMap<String, Vec<String>> {
    let mut dump: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        dump.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    dump
}

/// IP part of a peer address string; the verbatim string when unparsable.
pub fn client_ip(peer: &str) -> String {
    if let Ok(addr) = peer.parse::<SocketAddr>() {
        return addr.ip().to_string();
    }
    if let Ok(ip) = peer.parse::<IpAddr>() {
        return ip.to_string();
    }
    peer.to_string()
}

/// Connection facts for one request. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionReport {
    remote_addr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    local_address: Option<String>,
    incoming_mss: u32,
    mss_source: MssSource,
    mss_status: MssOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    mtu: Option<u32>,
    tls_version: TlsVersion,
    cipher_suite: String,
    host: String,
    client_ip: String,
    headers: BTreeMap<String, Vec<String>>,
}

impl ConnectionReport {
    pub fn build(
        acquisition: &Acquisition,
        mss: MssReading,
        tls: TlsInspection,
        meta: RequestMeta,
    ) -> Self {
        let remote_addr = acquisition
            .remote_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|| meta.peer.clone());

        let client_ip = match acquisition.remote_addr() {
            Some(addr) if meta.peer.is_empty() => addr.ip().to_string(),
            _ => client_ip(&meta.peer),
        };

        Self {
            remote_addr,
            local_address: acquisition.local_addr().map(|a| a.to_string()),
            incoming_mss: mss.value(),
            mss_source: acquisition.source(),
            mss_status: mss.origin(),
            mtu: mss.mtu(),
            tls_version: tls.version,
            cipher_suite: tls.cipher_suite,
            host: meta.host,
            client_ip,
            headers: meta.headers,
        }
    }

    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    pub fn local_address(&self) -> Option<&str> {
        self.local_address.as_deref()
    }

    pub fn incoming_mss(&self) -> u32 {
        self.incoming_mss
    }

    pub fn mss_source(&self) -> MssSource {
        self.mss_source
    }

    pub fn mss_status(&self) -> MssOrigin {
        self.mss_status
    }

    pub fn mtu(&self) -> Option<u32> {
        self.mtu
    }

    pub fn tls_version(&self) -> TlsVersion {
        self.tls_version
    }

    pub fn cipher_suite(&self) -> &str {
        &self.cipher_suite
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn client_ip(&self) -> &str {
        &self.client_ip
    }

    pub fn headers(&self) -> &BTreeMap<String, Vec<String>> {
        &self.headers
    }
}
