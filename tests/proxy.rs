//! Integration tests for the broadcast dispatch pipeline: body capture,
//! signature verification, fan-out, and aggregation.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;

use spraycast::metrics::{outcome, InMemoryMetrics};
use spraycast::proxy::{signature, ProxyConfig, SprayProxy};
use spraycast::server;

const SECRET: &str = "testSecret";

#[derive(Debug)]
struct RecordedRequest {
    method: String,
    path: String,
    query: Option<String>,
    body: Vec<u8>,
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<RecordedRequest>>>);

impl Recorder {
    fn requests(&self) -> Vec<RecordedRequest> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

#[derive(Clone)]
struct BackendBehavior {
    status: StatusCode,
    delay: Duration,
}

async fn record(
    State((recorder, behavior)): State<(Recorder, BackendBehavior)>,
    req: Request,
) -> Response {
    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    recorder.0.lock().unwrap().push(RecordedRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(String::from),
        body: bytes.to_vec(),
    });
    if !behavior.delay.is_zero() {
        tokio::time::sleep(behavior.delay).await;
    }
    behavior.status.into_response()
}

async fn spawn_backend(status: StatusCode, delay: Duration) -> (String, Recorder) {
    let recorder = Recorder::default();
    let app = Router::new()
        .fallback(record)
        .with_state((recorder.clone(), BackendBehavior { status, delay }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), recorder)
}

/// A port nothing is listening on.
async fn unreachable_origin() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn spawn_proxy(
    config: ProxyConfig,
    backends: Vec<String>,
) -> (String, Arc<InMemoryMetrics>) {
    let metrics = Arc::new(InMemoryMetrics::new());
    let proxy = Arc::new(SprayProxy::new(config, backends, metrics.clone()).unwrap());
    let router = server::build_router(proxy);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{addr}"), metrics)
}

fn signing_config() -> ProxyConfig {
    ProxyConfig {
        webhook_secret: Some(SECRET.to_string()),
        ..ProxyConfig::default()
    }
}

fn insecure_config() -> ProxyConfig {
    ProxyConfig {
        insecure_skip_webhook_verify: true,
        ..ProxyConfig::default()
    }
}

async fn post_signed(url: &str, body: &[u8]) -> reqwest::Response {
    reqwest::Client::new()
        .post(url)
        .header(signature::SIGNATURE_HEADER, signature::sign(body, SECRET))
        .body(body.to_vec())
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn broadcast_delivers_identical_bytes_to_every_backend() {
    let (origin_a, recorder_a) = spawn_backend(StatusCode::OK, Duration::ZERO).await;
    let (origin_b, recorder_b) = spawn_backend(StatusCode::OK, Duration::ZERO).await;
    let (proxy_url, metrics) = spawn_proxy(signing_config(), vec![origin_a, origin_b]).await;

    let body = br#"{"action":"push","ref":"refs/heads/main"}"#;
    let resp = post_signed(&format!("{proxy_url}/?delivery=42"), body).await;

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "proxied");

    for recorder in [recorder_a, recorder_b] {
        let requests = recorder.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].path, "/");
        assert_eq!(requests[0].query.as_deref(), Some("delivery=42"));
        assert_eq!(requests[0].body, body);
    }

    assert_eq!(metrics.inbound_count(), 1);
    assert_eq!(metrics.forwarded_total(), 2);
    assert_eq!(metrics.latency_observation_count(), 2);
}

#[tokio::test]
async fn zero_backends_is_a_vacuous_success() {
    let (proxy_url, metrics) = spawn_proxy(signing_config(), Vec::new()).await;

    let resp = post_signed(&proxy_url, b"payload").await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "proxied");
    assert_eq!(metrics.forwarded_total(), 0);
}

#[tokio::test]
async fn unreachable_backend_yields_bad_gateway() {
    let dead = unreachable_origin().await;
    let (proxy_url, metrics) = spawn_proxy(signing_config(), vec![dead.clone()]).await;

    let resp = post_signed(&proxy_url, b"payload").await;
    assert_eq!(resp.status(), 502);
    assert_eq!(resp.text().await.unwrap(), "failed to proxy");

    let host = dead.trim_start_matches("http://");
    assert_eq!(metrics.forwarded_count(host, outcome::TRANSPORT_ERROR), 1);
}

#[tokio::test]
async fn one_failed_leg_dominates_but_healthy_legs_still_deliver() {
    let (origin, recorder) = spawn_backend(StatusCode::OK, Duration::ZERO).await;
    let dead = unreachable_origin().await;
    let (proxy_url, _) = spawn_proxy(signing_config(), vec![origin, dead]).await;

    let resp = post_signed(&proxy_url, b"payload").await;
    assert_eq!(resp.status(), 502);

    // The dead leg never short-circuits delivery to its sibling
    let requests = recorder.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].body, b"payload");
}

#[tokio::test]
async fn backend_http_error_does_not_fail_the_broadcast() {
    let (origin, _recorder) =
        spawn_backend(StatusCode::INTERNAL_SERVER_ERROR, Duration::ZERO).await;
    let (proxy_url, metrics) = spawn_proxy(signing_config(), vec![origin.clone()]).await;

    let resp = post_signed(&proxy_url, b"payload").await;
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "proxied");

    let host = origin.trim_start_matches("http://");
    assert_eq!(metrics.forwarded_count(host, outcome::HTTP_ERROR), 1);
}

#[tokio::test]
async fn slow_backend_times_out_without_delaying_siblings() {
    let (slow, _) = spawn_backend(StatusCode::OK, Duration::from_secs(5)).await;
    let (fast, recorder) = spawn_backend(StatusCode::OK, Duration::ZERO).await;
    let config = ProxyConfig {
        forward_timeout: Duration::from_millis(250),
        ..signing_config()
    };
    let (proxy_url, _) = spawn_proxy(config, vec![slow, fast]).await;

    let resp = post_signed(&proxy_url, b"payload").await;
    assert_eq!(resp.status(), 502);
    assert_eq!(recorder.requests().len(), 1);
}

#[tokio::test]
async fn tampered_signature_is_rejected_with_generic_400() {
    let (origin, recorder) = spawn_backend(StatusCode::OK, Duration::ZERO).await;
    let (proxy_url, _) = spawn_proxy(signing_config(), vec![origin]).await;

    let body = b"payload";
    let mut tampered = signature::sign(body, SECRET);
    let last = tampered.pop().unwrap();
    tampered.push(if last == '0' { '1' } else { '0' });

    let resp = reqwest::Client::new()
        .post(&proxy_url)
        .header(signature::SIGNATURE_HEADER, tampered)
        .body(body.to_vec())
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    assert_eq!(resp.text().await.unwrap(), "bad request");
    assert!(recorder.requests().is_empty());
}

#[tokio::test]
async fn missing_signature_is_rejected_with_generic_400() {
    let (proxy_url, _) = spawn_proxy(signing_config(), Vec::new()).await;

    let resp = reqwest::Client::new()
        .post(&proxy_url)
        .body("payload")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    assert_eq!(resp.text().await.unwrap(), "bad request");
}

#[tokio::test]
async fn verification_skip_accepts_unsigned_requests() {
    let (origin, recorder) = spawn_backend(StatusCode::OK, Duration::ZERO).await;
    let (proxy_url, _) = spawn_proxy(insecure_config(), vec![origin]).await;

    let resp = reqwest::Client::new()
        .post(&proxy_url)
        .body("payload")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(recorder.requests().len(), 1);
}

#[tokio::test]
async fn body_at_the_size_limit_is_accepted_and_over_it_rejected() {
    let (origin, recorder) = spawn_backend(StatusCode::OK, Duration::ZERO).await;
    let config = ProxyConfig {
        max_request_size: 64,
        ..insecure_config()
    };
    let (proxy_url, _) = spawn_proxy(config, vec![origin]).await;

    let resp = reqwest::Client::new()
        .post(&proxy_url)
        .body(vec![0x61u8; 64])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(recorder.requests().len(), 1);

    let resp = reqwest::Client::new()
        .post(&proxy_url)
        .body(vec![0x61u8; 65])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 413);
    assert_eq!(resp.text().await.unwrap(), "request body too large");
    assert!(recorder.requests().is_empty());
}

#[tokio::test]
async fn proxy_mount_prefix_is_stripped_for_backends() {
    let (origin, recorder) = spawn_backend(StatusCode::OK, Duration::ZERO).await;
    let (proxy_url, _) = spawn_proxy(insecure_config(), vec![origin]).await;

    let resp = reqwest::Client::new()
        .post(format!("{proxy_url}/proxy?ref=main"))
        .body("payload")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let requests = recorder.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/");
    assert_eq!(requests[0].query.as_deref(), Some("ref=main"));
}
