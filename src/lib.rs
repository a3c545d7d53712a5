//! connscope library.
//!
//! An HTTP(S) endpoint that reports, per request, the TCP maximum segment
//! size and TLS parameters of the connection the request arrived on.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod probe;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use probe::{ConnectionReport, Prober};
