//! TLS session inspection.
//!
//! Maps the negotiated protocol version and cipher suite of a TLS session
//! to the names reported to clients. Plain connections have no session and
//! map to `Unknown` / empty.

use serde::Serialize;

/// Negotiated parameters captured from a finished TLS handshake.
///
/// Values are the raw wire codes so that versions and suites unknown to the
/// TLS library still round-trip into the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsSession {
    protocol_version: Option<u16>,
    cipher_suite: Option<u16>,
}

impl TlsSession {
    pub fn new(protocol_version: Option<u16>, cipher_suite: Option<u16>) -> Self {
        Self {
            protocol_version,
            cipher_suite,
        }
    }

    /// Capture the negotiated parameters of a server-side rustls connection.
    pub fn from_connection(conn: &rustls::ServerConnection) -> Self {
        Self {
            protocol_version: conn.protocol_version().map(u16::from),
            cipher_suite: conn.negotiated_cipher_suite().map(|cs| u16::from(cs.suite())),
        }
    }

    pub fn protocol_version(&self) -> Option<u16> {
        self.protocol_version
    }

    pub fn cipher_suite(&self) -> Option<u16> {
        self.cipher_suite
    }
}

/// Reported TLS protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TlsVersion {
    #[serde(rename = "TLS 1.0")]
    Tls10,
    #[serde(rename = "TLS 1.1")]
    Tls11,
    #[serde(rename = "TLS 1.2")]
    Tls12,
    #[serde(rename = "TLS 1.3")]
    Tls13,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl TlsVersion {
    /// Total mapping from a wire version code.
    pub fn from_wire(code: u16) -> Self {
        match code {
            0x0301 => TlsVersion::Tls10,
            0x0302 => TlsVersion::Tls11,
            0x0303 => TlsVersion::Tls12,
            0x0304 => TlsVersion::Tls13,
            _ => TlsVersion::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TlsVersion::Tls10 => "TLS 1.0",
            TlsVersion::Tls11 => "TLS 1.1",
            TlsVersion::Tls12 => "TLS 1.2",
            TlsVersion::Tls13 => "TLS 1.3",
            TlsVersion::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of inspecting the (optional) TLS session of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsInspection {
    pub version: TlsVersion,
    pub cipher_suite: String,
}

impl TlsInspection {
    pub fn plain() -> Self {
        Self {
            version: TlsVersion::Unknown,
            cipher_suite: String::new(),
        }
    }
}

/// Map the request's TLS state to reportable names.
pub fn inspect(session: Option<&TlsSession>) -> TlsInspection {
    let Some(session) = session else {
        return TlsInspection::plain();
    };

    TlsInspection {
        version: session
            .protocol_version()
            .map(TlsVersion::from_wire)
            .unwrap_or(TlsVersion::Unknown),
        cipher_suite: session.cipher_suite().map(cipher_suite_name).unwrap_or_default(),
    }
}

/// IANA name of a cipher suite code.
///
/// Unregistered codes produce a labelled `unrecognized (0xNNNN)` string.
pub fn cipher_suite_name(code: u16) -> String {
    match iana_cipher_suite_name(code) {
        Some(name) => name.to_string(),
        None => format!("unrecognized (0x{code:04X})"),
    }
}

fn iana_cipher_suite_name(code: u16) -> Option<&'static str> {
    let name = match code {
        // TLS 1.3
        0x1301 => "TLS_AES_128_GCM_SHA256",
        0x1302 => "TLS_AES_256_GCM_SHA384",
        0x1303 => "TLS_CHACHA20_POLY1305_SHA256",
        0x1304 => "TLS_AES_128_CCM_SHA256",
        0x1305 => "TLS_AES_128_CCM_8_SHA256",

        // ECDHE
        0xc009 => "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA",
        0xc00a => "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA",
        0xc007 => "TLS_ECDHE_ECDSA_WITH_RC4_128_SHA",
        0xc011 => "TLS_ECDHE_RSA_WITH_RC4_128_SHA",
        0xc012 => "TLS_ECDHE_RSA_WITH_3DES_EDE_CBC_SHA",
        0xc013 => "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
        0xc014 => "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
        0xc023 => "TLS_ECDHE_ECDSA_WITH_AES_128_CBC_SHA256",
        0xc024 => "TLS_ECDHE_ECDSA_WITH_AES_256_CBC_SHA384",
        0xc027 => "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256",
        0xc028 => "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA384",
        0xc02b => "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
        0xc02c => "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
        0xc02f => "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
        0xc030 => "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
        0xcca8 => "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
        0xcca9 => "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",

        // DHE
        0x0033 => "TLS_DHE_RSA_WITH_AES_128_CBC_SHA",
        0x0039 => "TLS_DHE_RSA_WITH_AES_256_CBC_SHA",
        0x009e => "TLS_DHE_RSA_WITH_AES_128_GCM_SHA256",
        0x009f => "TLS_DHE_RSA_WITH_AES_256_GCM_SHA384",
        0xccaa => "TLS_DHE_RSA_WITH_CHACHA20_POLY1305_SHA256",

        // RSA key exchange
        0x0005 => "TLS_RSA_WITH_RC4_128_SHA",
        0x000a => "TLS_RSA_WITH_3DES_EDE_CBC_SHA",
        0x002f => "TLS_RSA_WITH_AES_128_CBC_SHA",
        0x0035 => "TLS_RSA_WITH_AES_256_CBC_SHA",
        0x003c => "TLS_RSA_WITH_AES_128_CBC_SHA256",
        0x003d => "TLS_RSA_WITH_AES_256_CBC_SHA256",
        0x009c => "TLS_RSA_WITH_AES_128_GCM_SHA256",
        0x009d => "TLS_RSA_WITH_AES_256_GCM_SHA384",

        // Signalling values
        0x00ff => "TLS_EMPTY_RENEGOTIATION_INFO_SCSV",
        0x5600 => "TLS_FALLBACK_SCSV",
        _ => return None,
    };
    Some(name)
}
