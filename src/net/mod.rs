//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind)
//!     → tls.rs (optional TLS handshake config)
//!     → acceptor.rs (record socket + TLS facts after accept/handshake)
//!     → connection.rs (ConnectionHandle, hijack slot)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - TLS is optional and handled transparently
//! - Socket capture happens once per connection, before any request is read

pub mod acceptor;
pub mod connection;
pub mod listener;
pub mod tls;

pub use acceptor::IntrospectAcceptor;
pub use connection::{ConnectionHandle, ConnectionId, HijackedConnection};
