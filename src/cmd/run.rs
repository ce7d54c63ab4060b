//! `spraycast run` — start the broadcast proxy server.
//!
//! Builds the proxy from CLI flags (failing fast on a missing webhook
//! secret or malformed static backend), then serves the Axum router
//! with graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::RunArgs;
use crate::error::SprayError;
use crate::logging;
use crate::metrics::{InMemoryMetrics, MetricsSink};
use crate::proxy::{ProxyConfig, SprayProxy};
use crate::server;

pub async fn execute(args: RunArgs) -> Result<(), SprayError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(&args.log_level, log_format);

    let config = ProxyConfig {
        insecure_skip_tls_verify: args.insecure_skip_tls_verify,
        insecure_skip_webhook_verify: args.insecure_skip_webhook_verify,
        enable_dynamic_backends: args.enable_dynamic_backends,
        webhook_secret: args.webhook_secret,
        forward_timeout: Duration::from_millis(args.timeout),
        max_request_size: args.max_request_size,
    };

    let metrics: Arc<dyn MetricsSink> = Arc::new(InMemoryMetrics::new());
    let proxy = Arc::new(SprayProxy::new(config, args.backends, metrics)?);

    tracing::info!(timeout_ms = args.timeout, "proxy forwarding request timeout set");
    tracing::info!(
        max_request_size = args.max_request_size,
        "proxy max request size set"
    );
    if proxy.insecure_skip_tls_verify() {
        tracing::warn!("Skipping TLS verification on backends");
    }

    let backends = proxy.registry().list().await;
    let router = server::build_router(Arc::clone(&proxy));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        addr = %addr,
        backends = %backends.join(","),
        dynamic_backends = args.enable_dynamic_backends,
        "spraycast started"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    tracing::info!("spraycast stopped");
    Ok(())
}
