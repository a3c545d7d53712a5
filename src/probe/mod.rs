//! Connection-metadata extraction pipeline.
//!
//! # Data Flow
//! ```text
//! ConnectionHandle (recorded at accept)
//!     → acquire.rs (hijack | context lookup | side-channel dial)
//!     → sockopt.rs (TCP_MAXSEG, path MTU, fallback policy)
//!     → tls.rs (version + cipher suite names)      [independent of sockopt]
//!     → report.rs (ConnectionReport)
//!     → drop Acquisition (owned sockets closed)
//! ```
//!
//! # Design Decisions
//! - The strategy is explicit and reported as `mss_source`
//! - Estimated MSS values are labelled, never passed off as measured
//! - Only hijack failures abort a request; everything else degrades to sentinels

pub mod acquire;
pub mod dial;
pub mod error;
pub mod prober;
pub mod report;
pub mod sockopt;
pub mod tls;

pub use acquire::{Acquisition, AcquisitionStrategy, MssSource};
pub use error::ProbeError;
pub use prober::Prober;
pub use report::{ConnectionReport, RequestMeta};
