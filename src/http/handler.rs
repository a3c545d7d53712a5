//! Diagnostic endpoint.
//!
//! # States
//! ```text
//! Accepted → Acquiring → Extracting → Composing → Responding → Closed
//!                │
//!                └──────→ Aborted (error response, nothing extracted)
//! ```
//!
//! Every socket the acquisition owns is released in `Closed`, including
//! when the handler future is dropped by the request timeout.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use tracing::Instrument;

use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::net::connection::ConnectionHandle;
use crate::observability::metrics;
use crate::probe::report::{ConnectionReport, RequestMeta};
use crate::probe::tls;

/// Handler lifecycle stage, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Accepted,
    Acquiring,
    Extracting,
    Composing,
    Responding,
    Closed,
    Aborted,
}

fn enter(stage: Stage) {
    tracing::debug!(stage = ?stage, "Probe stage");
}

/// Report the connection carrying this request.
pub async fn diagnose(State(state): State<AppState>, request: Request) -> Response {
    let handle = request.extensions().get::<ConnectionHandle>().cloned();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
        .or_else(|| handle.as_ref().and_then(|h| h.peer_addr()));

    let span = tracing::debug_span!(
        "probe",
        request_id = %request_id(&request),
        connection_id = %handle.as_ref().map(|h| h.id().to_string()).unwrap_or_else(|| "none".into()),
        strategy = %state.prober.strategy(),
    );

    run_probe(state, handle, peer, request).instrument(span).await
}

async fn run_probe(
    state: AppState,
    handle: Option<ConnectionHandle>,
    peer: Option<SocketAddr>,
    request: Request,
) -> Response {
    let start = Instant::now();
    let strategy = state.prober.strategy().as_str();

    enter(Stage::Accepted);
    let meta = RequestMeta::from_request(&request, peer);
    let version = request.version();

    enter(Stage::Acquiring);
    let acquisition = match state.prober.acquire(handle.as_ref(), peer, version).await {
        Ok(acquisition) => acquisition,
        Err(e) => {
            enter(Stage::Aborted);
            tracing::warn!(error = %e, "Probe aborted");
            metrics::record_probe(strategy, e.kind(), start);
            return e.into_response();
        }
    };

    enter(Stage::Extracting);
    let mss = state.prober.extract(&acquisition);
    let tls = tls::inspect(handle.as_ref().and_then(|h| h.tls_session()));

    enter(Stage::Composing);
    let report = ConnectionReport::build(&acquisition, mss, tls, meta);

    enter(Stage::Responding);
    let mut response = Json(&report).into_response();
    if acquisition.is_hijacked() {
        // The connection was taken over; it ends with this response.
        response
            .headers_mut()
            .insert(header::CONNECTION, HeaderValue::from_static("close"));
    }

    enter(Stage::Closed);
    drop(acquisition);

    tracing::info!(
        mss = report.incoming_mss(),
        mss_source = report.mss_source().as_str(),
        tls_version = %report.tls_version(),
        "Connection reported"
    );
    metrics::record_mss(report.mss_source().as_str(), report.incoming_mss());
    metrics::record_probe(strategy, "reported", start);

    response
}
