//! End-to-end tests for the diagnostic endpoint over plain HTTP.

mod common;

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use common::{start_server, FixedSockets, PendingDialer};
use connscope::config::ServiceConfig;
use connscope::probe::AcquisitionStrategy;
use connscope::{HttpServer, Prober};

fn config_with(strategy: AcquisitionStrategy) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.probe.strategy = strategy;
    config
}

#[tokio::test]
async fn hijacked_connection_reports_fixed_mss() {
    let config = config_with(AcquisitionStrategy::Hijack);
    let sockets = Arc::new(FixedSockets::new(Some(1380), None));
    let reads = sockets.reads();
    let prober = Prober::new(&config.probe).with_socket_reader(sockets);
    let server = start_server(config, prober);

    let res = reqwest::get(server.url("/anything?x=1")).await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers().get("connection").and_then(|v| v.to_str().ok()),
        Some("close")
    );
    assert!(res.headers().contains_key("x-request-id"));

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["incoming_mss"], 1380);
    assert_eq!(body["mss_source"], "hijacked");
    assert_eq!(body["mss_status"], "measured");
    assert_eq!(body["tls_version"], "Unknown");
    assert_eq!(body["cipher_suite"], "");
    assert_eq!(body["client_ip"], "127.0.0.1");
    assert_eq!(body["host"], server.addr.to_string());
    assert!(body["remote_addr"].as_str().unwrap().starts_with("127.0.0.1:"));
    assert_eq!(body["local_address"], server.addr.to_string());
    assert_eq!(reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn hijacked_connection_reads_kernel_mss() {
    let config = config_with(AcquisitionStrategy::Hijack);
    let prober = Prober::new(&config.probe);
    let server = start_server(config, prober);

    let body: Value = reqwest::get(server.url("/")).await.unwrap().json().await.unwrap();
    let mss = body["incoming_mss"].as_u64().unwrap();
    assert!(mss > 0 && mss <= 65_535, "loopback mss {mss}");
    assert_eq!(body["mss_status"], "measured");
}

#[tokio::test]
async fn each_request_gets_its_own_connection_report() {
    let config = config_with(AcquisitionStrategy::Hijack);
    let sockets = Arc::new(FixedSockets::new(Some(1400), None));
    let reads = sockets.reads();
    let prober = Prober::new(&config.probe).with_socket_reader(sockets);
    let server = start_server(config, prober);

    // The pooled client reconnects because every hijacked response closes.
    let client = reqwest::Client::new();
    for _ in 0..3 {
        let res = client.get(server.url("/")).send().await.unwrap();
        assert_eq!(res.status(), 200);
    }
    assert_eq!(reads.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn request_headers_are_echoed() {
    let config = config_with(AcquisitionStrategy::Hijack);
    let prober = Prober::new(&config.probe)
        .with_socket_reader(Arc::new(FixedSockets::new(Some(1380), None)));
    let server = start_server(config, prober);

    let body: Value = reqwest::Client::new()
        .get(server.url("/"))
        .header("x-probe", "a")
        .header("x-request-id", "req-42")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["headers"]["x-probe"], serde_json::json!(["a"]));
    assert_eq!(body["headers"]["x-request-id"], serde_json::json!(["req-42"]));
}

#[tokio::test]
async fn http2_streams_never_hijack_their_shared_connection() {
    let config = config_with(AcquisitionStrategy::Hijack);
    let sockets = Arc::new(FixedSockets::new(Some(1380), None));
    let reads = sockets.reads();
    let prober = Prober::new(&config.probe).with_socket_reader(sockets);
    let server = start_server(config, prober);

    let client = reqwest::Client::builder()
        .http2_prior_knowledge()
        .build()
        .unwrap();
    for _ in 0..3 {
        let res = client.get(server.url("/")).send().await.unwrap();
        assert_eq!(res.version(), reqwest::Version::HTTP_2);
        assert_eq!(res.status(), 500);
        let text = res.text().await.unwrap();
        assert!(text.starts_with("Hijacking not supported"), "{text}");
    }
    assert_eq!(reads.load(Ordering::SeqCst), 0);

    // HTTP/1 requests on the same server still take their own connection.
    let body: Value = reqwest::get(server.url("/")).await.unwrap().json().await.unwrap();
    assert_eq!(body["mss_source"], "hijacked");
    assert_eq!(body["incoming_mss"], 1380);
}

#[tokio::test]
async fn http2_streams_report_context_on_every_request() {
    let config = config_with(AcquisitionStrategy::ContextLookup);
    let prober = Prober::new(&config.probe);
    let server = start_server(config, prober);

    let client = reqwest::Client::builder()
        .http2_prior_knowledge()
        .build()
        .unwrap();
    for _ in 0..3 {
        let res = client.get(server.url("/")).send().await.unwrap();
        assert_eq!(res.version(), reqwest::Version::HTTP_2);
        assert_eq!(res.status(), 200);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["mss_source"], "context_derived");
    }
}

#[tokio::test]
async fn serving_without_connection_handle_is_not_hijackable() {
    let config = config_with(AcquisitionStrategy::Hijack);
    let sockets = Arc::new(FixedSockets::new(Some(1380), None));
    let reads = sockets.reads();
    let prober = Prober::new(&config.probe).with_socket_reader(sockets);
    let app = HttpServer::with_prober(config, prober)
        .router()
        .into_make_service_with_connect_info::<SocketAddr>();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let res = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(res.status(), 500);
    let text = res.text().await.unwrap();
    assert!(text.starts_with("Hijacking not supported"), "{text}");
    assert_eq!(reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn context_lookup_reports_zero_mss() {
    let config = config_with(AcquisitionStrategy::ContextLookup);
    let sockets = Arc::new(FixedSockets::new(Some(1380), None));
    let reads = sockets.reads();
    let prober = Prober::new(&config.probe).with_socket_reader(sockets);
    let server = start_server(config, prober);

    let res = reqwest::get(server.url("/")).await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().get("connection").is_none());

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["incoming_mss"], 0);
    assert_eq!(body["mss_source"], "context_derived");
    assert_eq!(body["mss_status"], "unavailable");
    assert_eq!(reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn context_lookup_with_fallback_is_labelled_estimated() {
    let mut config = config_with(AcquisitionStrategy::ContextLookup);
    config.probe.mss_fallback = true;
    let prober = Prober::new(&config.probe);
    let server = start_server(config, prober);

    let body: Value = reqwest::get(server.url("/")).await.unwrap().json().await.unwrap();
    assert_eq!(body["incoming_mss"], 1460);
    assert_eq!(body["mss_status"], "estimated");
}

#[tokio::test]
async fn stalled_side_channel_dial_is_bounded() {
    let mut config = config_with(AcquisitionStrategy::SideChannel);
    config.probe.dial_timeout_ms = 200;
    let prober = Prober::new(&config.probe).with_dialer(Arc::new(PendingDialer));
    let server = start_server(config, prober);

    let start = Instant::now();
    let res = reqwest::get(server.url("/")).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["incoming_mss"], 0);
    assert_eq!(body["mss_source"], "side_channel_sampled");
    assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "{elapsed:?}");
}

#[tokio::test]
async fn side_channel_samples_a_listening_peer() {
    // The client side of the loopback connection is 127.0.0.1; point the
    // side channel at a listener there.
    let target = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = target.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((socket, _)) = target.accept().await {
            drop(socket);
        }
    });

    let mut config = config_with(AcquisitionStrategy::SideChannel);
    config.probe.side_channel_port = port;
    let prober = Prober::new(&config.probe);
    let server = start_server(config, prober);

    let body: Value = reqwest::get(server.url("/")).await.unwrap().json().await.unwrap();
    assert_eq!(body["mss_source"], "side_channel_sampled");
    assert_eq!(body["mss_status"], "measured");
    assert!(body["incoming_mss"].as_u64().unwrap() > 0);
}
