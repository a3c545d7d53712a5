//! Kernel socket option reads.
//!
//! # Responsibilities
//! - Read `TCP_MAXSEG` from a connected TCP socket
//! - Best-effort path MTU lookup (Linux only)
//! - Apply the MSS fallback policy and label the result
//!
//! # Design Decisions
//! - Reads never close or reconfigure the descriptor
//! - A failed or implausible read is `None`, never `0`
//! - Estimated values carry `MssOrigin::Estimated` all the way into the report

use std::os::fd::BorrowedFd;

use serde::Serialize;
use socket2::{SockRef, Type};

/// Standard Ethernet-based IPv4 MSS used when no MTU is known.
pub const DEFAULT_MSS: u32 = 1460;

/// IPv4 + TCP header overhead subtracted from an MTU to estimate the MSS.
pub const TCP_IP_OVERHEAD: u32 = 40;

/// Largest MSS value accepted as a real measurement.
pub const MAX_PLAUSIBLE_MSS: u32 = 65_535;

/// Returns true for values in `(0, 65535]`.
pub fn is_plausible_mss(value: u32) -> bool {
    value > 0 && value <= MAX_PLAUSIBLE_MSS
}

/// Read the TCP maximum segment size of a socket.
///
/// Returns `None` when the socket is not TCP, refuses the option, or
/// reports a value outside `(0, 65535]`. Closed descriptors cannot be
/// borrowed, so they never get here.
pub fn read_max_segment_size(socket: BorrowedFd<'_>) -> Option<u32> {
    match SockRef::from(&socket).mss() {
        Ok(value) => Some(value).filter(|v| is_plausible_mss(*v)),
        Err(e) => {
            tracing::debug!(error = %e, "TCP_MAXSEG not readable");
            None
        }
    }
}

/// Returns true when the descriptor is an IPv4/IPv6 stream socket.
pub fn is_tcp_socket(socket: BorrowedFd<'_>) -> bool {
    let sock = SockRef::from(&socket);
    matches!(sock.r#type(), Ok(kind) if kind == Type::STREAM)
        && sock
            .local_addr()
            .ok()
            .and_then(|addr| addr.as_socket())
            .is_some()
}

#[cfg(target_os = "linux")]
fn getsockopt_int(
    socket: BorrowedFd<'_>,
    level: libc::c_int,
    name: libc::c_int,
) -> std::io::Result<libc::c_int> {
    use std::os::fd::AsRawFd;

    let mut value: libc::c_int = 0;
    let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;

    // SAFETY: `value` and `len` are valid for writes for the duration of the
    // call, and `socket` is a live descriptor for the borrow's lifetime.
    let ret = unsafe {
        libc::getsockopt(
            socket.as_raw_fd(),
            level,
            name,
            &mut value as *mut _ as *mut libc::c_void,
            &mut len,
        )
    };

    if ret == 0 {
        Ok(value)
    } else {
        Err(std::io::Error::last_os_error())
    }
}

/// Best-effort path MTU of a connected socket.
#[cfg(target_os = "linux")]
pub fn read_path_mtu(socket: BorrowedFd<'_>) -> Option<u32> {
    getsockopt_int(socket, libc::IPPROTO_IP, libc::IP_MTU)
        .or_else(|_| getsockopt_int(socket, libc::IPPROTO_IPV6, libc::IPV6_MTU))
        .ok()
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
}

/// Best-effort path MTU of a connected socket.
#[cfg(not(target_os = "linux"))]
pub fn read_path_mtu(_socket: BorrowedFd<'_>) -> Option<u32> {
    None
}

/// Source of socket option values.
///
/// `KernelSockets` issues real syscalls; tests substitute fixed readers.
pub trait SocketOptionReader: Send + Sync {
    fn max_segment_size(&self, socket: BorrowedFd<'_>) -> Option<u32>;

    fn path_mtu(&self, socket: BorrowedFd<'_>) -> Option<u32>;
}

/// Reads socket options straight from the kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct KernelSockets;

impl SocketOptionReader for KernelSockets {
    fn max_segment_size(&self, socket: BorrowedFd<'_>) -> Option<u32> {
        read_max_segment_size(socket)
    }

    fn path_mtu(&self, socket: BorrowedFd<'_>) -> Option<u32> {
        read_path_mtu(socket)
    }
}

/// How an MSS value came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MssOrigin {
    /// Read from the kernel for the probed socket.
    Measured,
    /// Substituted by the fallback policy.
    Estimated,
    /// Nothing could be determined; the value is the `0` sentinel.
    Unavailable,
}

/// An MSS value together with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MssReading {
    value: u32,
    origin: MssOrigin,
    mtu: Option<u32>,
}

impl MssReading {
    pub fn measured(value: u32, mtu: Option<u32>) -> Self {
        Self { value, origin: MssOrigin::Measured, mtu }
    }

    pub fn estimated(value: u32, mtu: Option<u32>) -> Self {
        Self { value, origin: MssOrigin::Estimated, mtu }
    }

    pub fn unavailable(mtu: Option<u32>) -> Self {
        Self { value: 0, origin: MssOrigin::Unavailable, mtu }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn origin(&self) -> MssOrigin {
        self.origin
    }

    pub fn mtu(&self) -> Option<u32> {
        self.mtu
    }
}

/// Fallback policy for unreadable or implausible MSS values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MssFallback {
    pub enabled: bool,
    pub default_mss: u32,
}

impl Default for MssFallback {
    fn default() -> Self {
        Self {
            enabled: false,
            default_mss: DEFAULT_MSS,
        }
    }
}

impl MssFallback {
    /// Turn a raw read (and an optional MTU) into a labelled reading.
    pub fn resolve(&self, raw: Option<u32>, mtu: Option<u32>) -> MssReading {
        if let Some(value) = raw.filter(|v| is_plausible_mss(*v)) {
            return MssReading::measured(value, mtu);
        }

        if !self.enabled {
            return MssReading::unavailable(mtu);
        }

        let estimate = mtu
            .map(|m| m.saturating_sub(TCP_IP_OVERHEAD))
            .filter(|v| is_plausible_mss(*v))
            .unwrap_or(self.default_mss);

        MssReading::estimated(estimate, mtu)
    }
}
