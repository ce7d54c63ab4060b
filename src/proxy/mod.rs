//! Core broadcast engine.
//!
//! [`SprayProxy`] holds the immutable proxy configuration, the backend
//! registry, the outbound HTTP client, and the metrics collaborator. The
//! [`handle_proxy`] / [`handle_proxy_endpoint`] handlers run the dispatch
//! pipeline: capture the body ([`guard`]), verify the webhook signature
//! ([`signature`]), snapshot the registry ([`registry`]), fan out
//! concurrently ([`fanout`]), and aggregate one response for the caller.
//! Runtime backend registration lives in [`backends`].

pub mod backends;
pub mod fanout;
pub mod guard;
pub mod registry;
pub mod signature;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::SprayError;
use crate::metrics::MetricsSink;
use crate::server::{self, HttpClient};
use fanout::FanOutRequest;
use registry::BackendRegistry;

/// Immutable proxy configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Skip certificate verification on all backends. Explicitly
    /// insecure; never the default.
    pub insecure_skip_tls_verify: bool,
    /// Skip webhook signature verification for every request.
    pub insecure_skip_webhook_verify: bool,
    /// Expose the runtime registration endpoints.
    pub enable_dynamic_backends: bool,
    /// Required unless verification is skipped.
    pub webhook_secret: Option<String>,
    /// Deadline for each per-backend forwarding attempt.
    pub forward_timeout: Duration,
    /// Maximum inbound request body size in bytes.
    pub max_request_size: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            insecure_skip_tls_verify: false,
            insecure_skip_webhook_verify: false,
            enable_dynamic_backends: false,
            webhook_secret: None,
            forward_timeout: Duration::from_secs(15),
            max_request_size: 25 * 1024 * 1024,
        }
    }
}

pub struct SprayProxy {
    config: ProxyConfig,
    registry: BackendRegistry,
    client: HttpClient,
    metrics: Arc<dyn MetricsSink>,
}

impl SprayProxy {
    /// Build the proxy from its configuration and static backend list.
    ///
    /// Fails fast with [`SprayError::NoSecretConfigured`] when webhook
    /// verification is enabled without a secret, and with
    /// [`SprayError::InvalidOrigin`] on a malformed static backend.
    pub fn new(
        config: ProxyConfig,
        backends: Vec<String>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Result<Self, SprayError> {
        if !config.insecure_skip_webhook_verify
            && config
                .webhook_secret
                .as_deref()
                .map_or(true, |secret| secret.is_empty())
        {
            return Err(SprayError::NoSecretConfigured);
        }
        let registry = BackendRegistry::from_static(backends)?;
        let client = server::build_http_client(config.insecure_skip_tls_verify);
        Ok(Self {
            config,
            registry,
            client,
            metrics,
        })
    }

    #[must_use]
    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<dyn MetricsSink> {
        &self.metrics
    }

    #[must_use]
    pub const fn dynamic_backends_enabled(&self) -> bool {
        self.config.enable_dynamic_backends
    }

    /// Whether the proxy skips certificate verification on backends.
    /// This setting is insecure and should not be used in production.
    #[must_use]
    pub const fn insecure_skip_tls_verify(&self) -> bool {
        self.config.insecure_skip_tls_verify
    }
}

/// `POST /` — broadcast to every registered backend.
pub async fn handle_proxy(State(proxy): State<Arc<SprayProxy>>, req: Request) -> Response {
    broadcast(&proxy, req, None).await
}

/// `POST /proxy` — same as [`handle_proxy`], with the mount prefix
/// stripped so backends always see requests rooted at `/`.
pub async fn handle_proxy_endpoint(
    State(proxy): State<Arc<SprayProxy>>,
    req: Request,
) -> Response {
    broadcast(&proxy, req, Some("/proxy")).await
}

async fn broadcast(proxy: &SprayProxy, req: Request, mount_prefix: Option<&str>) -> Response {
    proxy.metrics.inc_inbound();

    let (parts, body) = req.into_parts();
    let request_id = parts
        .headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

    let full_path = parts.uri.path();
    let path = mount_prefix.map_or(full_path, |prefix| {
        full_path.strip_prefix(prefix).unwrap_or(full_path)
    });
    let query = parts.uri.query();

    // The body stream can be read only once; everything downstream works
    // on this captured buffer.
    let body = match guard::capture(body, proxy.config.max_request_size).await {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                method = %parts.method,
                path = %full_path,
                error = %e,
                "rejected oversized request"
            );
            return (StatusCode::PAYLOAD_TOO_LARGE, "request body too large").into_response();
        }
    };

    if !proxy.config.insecure_skip_webhook_verify {
        // Non-empty by construction when verification is enabled
        let secret = proxy.config.webhook_secret.as_deref().unwrap_or_default();
        if let Err(e) = signature::verify(&parts.headers, &body, secret) {
            // Generic response; the two failure cases are never
            // distinguished for the caller.
            tracing::error!(
                request_id = %request_id,
                method = %parts.method,
                path = %full_path,
                error = %e,
                "bad request"
            );
            return (StatusCode::BAD_REQUEST, "bad request").into_response();
        }
    }

    let origins = proxy.registry.list().await;
    let results = fanout::fan_out(
        FanOutRequest {
            client: &proxy.client,
            origins,
            method: &parts.method,
            headers: &parts.headers,
            path,
            query,
            body: &body,
            timeout: proxy.config.forward_timeout,
            request_id: &request_id,
        },
        Arc::clone(&proxy.metrics),
    )
    .await;

    if results.iter().any(|r| r.outcome.is_failure()) {
        (StatusCode::BAD_GATEWAY, "failed to proxy").into_response()
    } else {
        (StatusCode::OK, "proxied").into_response()
    }
}
