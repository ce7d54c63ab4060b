//! Concurrent fan-out of one captured request to every backend origin.
//!
//! Each origin in the registry snapshot gets one outbound attempt as its
//! own Tokio task, bounded by the shared forwarding timeout. All tasks
//! are joined at a barrier before the aggregate decision is made: one
//! hung or failing backend never cancels, delays, or short-circuits the
//! attempts to its siblings. Backend responses are discarded — this is a
//! broadcast, not a pass-through.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{HeaderMap, Method, StatusCode};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};

use crate::metrics::{outcome, MetricsSink};
use crate::proxy::registry;
use crate::server::HttpClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The HTTP exchange completed; the backend's status is recorded but
    /// an application-level error (>= 400) does not fail the broadcast.
    Success(StatusCode),
    /// The exchange never completed: connect failure, I/O error, or the
    /// forwarding deadline expired.
    TransportError,
    /// The outbound request could not be constructed.
    RequestBuildError,
}

impl AttemptOutcome {
    /// Whether this attempt counts against the aggregate result.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::TransportError | Self::RequestBuildError)
    }

    #[must_use]
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::Success(status) if status.as_u16() >= 400 => outcome::HTTP_ERROR,
            Self::Success(_) => outcome::OK,
            Self::TransportError => outcome::TRANSPORT_ERROR,
            Self::RequestBuildError => outcome::BUILD_ERROR,
        }
    }
}

#[derive(Debug)]
pub struct AttemptResult {
    pub origin: String,
    pub host: String,
    pub outcome: AttemptOutcome,
    pub latency: Duration,
}

pub struct FanOutRequest<'a> {
    pub client: &'a HttpClient,
    /// Registry snapshot taken once at dispatch start.
    pub origins: Vec<String>,
    pub method: &'a Method,
    pub headers: &'a HeaderMap,
    /// Request path with any mount prefix already stripped.
    pub path: &'a str,
    pub query: Option<&'a str>,
    /// The captured body, shared read-only across all attempts.
    pub body: &'a Bytes,
    pub timeout: Duration,
    pub request_id: &'a str,
}

pub async fn fan_out(req: FanOutRequest<'_>, metrics: Arc<dyn MetricsSink>) -> Vec<AttemptResult> {
    // Hyper derives Host from the target URI; the caller's Host header
    // must not leak through to backends.
    let mut fwd_headers = req.headers.clone();
    fwd_headers.remove(hyper::header::HOST);

    let mut handles = Vec::with_capacity(req.origins.len());
    for origin in req.origins {
        let client = req.client.clone();
        let method = req.method.clone();
        let headers = fwd_headers.clone();
        let path = req.path.to_string();
        let query = req.query.map(String::from);
        let body = req.body.clone();
        let timeout = req.timeout;
        let request_id = req.request_id.to_string();
        let metrics = Arc::clone(&metrics);
        let task_origin = origin.clone();

        let handle = tokio::spawn(async move {
            attempt(
                client,
                task_origin,
                method,
                headers,
                path,
                query,
                body,
                timeout,
                &request_id,
                metrics.as_ref(),
            )
            .await
        });
        handles.push((origin, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (origin, handle) in handles {
        match handle.await {
            Ok(result) => results.push(result),
            Err(join_err) => {
                tracing::error!(backend = %origin, error = %join_err, "attempt task panicked");
                results.push(AttemptResult {
                    host: origin.clone(),
                    origin,
                    outcome: AttemptOutcome::TransportError,
                    latency: Duration::ZERO,
                });
            }
        }
    }
    results
}

#[allow(clippy::too_many_arguments, clippy::cast_possible_truncation)]
async fn attempt(
    client: HttpClient,
    origin: String,
    method: Method,
    headers: HeaderMap,
    path: String,
    query: Option<String>,
    body: Bytes,
    timeout: Duration,
    request_id: &str,
    metrics: &dyn MetricsSink,
) -> AttemptResult {
    let start = Instant::now();

    // Registry entries are validated at registration; a parse failure
    // here means the origin never entered through the front door.
    let url = match registry::validate_origin(&origin) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(
                request_id,
                backend = %origin,
                error = %e,
                "failed to parse backend origin"
            );
            metrics.inc_forwarded(&origin, outcome::BUILD_ERROR);
            return AttemptResult {
                host: origin.clone(),
                origin,
                outcome: AttemptOutcome::RequestBuildError,
                latency: start.elapsed(),
            };
        }
    };
    let host = authority(&url);
    let target = target_uri(&url, &path, query.as_deref());

    let mut builder = hyper::Request::builder().method(method.clone()).uri(&target);
    for (name, value) in &headers {
        builder = builder.header(name, value);
    }
    let outbound = match builder.body(Full::new(body)) {
        Ok(outbound) => outbound,
        Err(e) => {
            tracing::error!(
                request_id,
                method = %method,
                path = %path,
                backend = %host,
                error = %e,
                "failed to create request"
            );
            metrics.inc_forwarded(&host, outcome::BUILD_ERROR);
            return AttemptResult {
                origin,
                host,
                outcome: AttemptOutcome::RequestBuildError,
                latency: start.elapsed(),
            };
        }
    };

    // The deadline covers the full exchange, including draining an error
    // response body for logging.
    let exchange = async {
        let response = client.request(outbound).await?;
        let status = response.status();
        let error_body = if status.as_u16() >= 400 {
            response
                .into_body()
                .collect()
                .await
                .ok()
                .map(|collected| String::from_utf8_lossy(&collected.to_bytes()).into_owned())
        } else {
            None
        };
        Ok::<_, hyper_util::client::legacy::Error>((status, error_body))
    };

    let result = tokio::time::timeout(timeout, exchange).await;
    let latency = start.elapsed();
    let query = query.unwrap_or_default();

    let outcome = match result {
        Ok(Ok((status, error_body))) => {
            tracing::info!(
                request_id,
                method = %method,
                path = %path,
                query = %query,
                backend = %host,
                status = status.as_u16(),
                latency_ms = latency.as_millis() as u64,
                "proxied request"
            );
            if let Some(error_body) = error_body {
                tracing::info!(
                    request_id,
                    backend = %host,
                    status = status.as_u16(),
                    body = %error_body,
                    "backend returned error response"
                );
            }
            metrics.observe_forward_latency(latency.as_secs_f64());
            AttemptOutcome::Success(status)
        }
        Ok(Err(e)) => {
            tracing::error!(
                request_id,
                method = %method,
                path = %path,
                query = %query,
                backend = %host,
                latency_ms = latency.as_millis() as u64,
                error = %e,
                "proxy error"
            );
            AttemptOutcome::TransportError
        }
        Err(_) => {
            tracing::error!(
                request_id,
                method = %method,
                path = %path,
                query = %query,
                backend = %host,
                latency_ms = latency.as_millis() as u64,
                "forwarding request timed out"
            );
            AttemptOutcome::TransportError
        }
    };
    metrics.inc_forwarded(&host, outcome.metric_label());

    AttemptResult {
        origin,
        host,
        outcome,
        latency,
    }
}

/// `host` or `host:port` of a validated origin URL.
fn authority(url: &url::Url) -> String {
    let host = url.host_str().unwrap_or_default();
    url.port()
        .map_or_else(|| host.to_string(), |port| format!("{host}:{port}"))
}

/// Rebuild the target URI: backend scheme and authority, caller path and query.
fn target_uri(url: &url::Url, path: &str, query: Option<&str>) -> String {
    let path = if path.is_empty() { "/" } else { path };
    let mut target = format!("{}://{}{path}", url.scheme(), authority(url));
    if let Some(query) = query {
        target.push('?');
        target.push_str(query);
    }
    target
}
