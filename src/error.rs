//! Unified error types for spraycast.
//!
//! [`SprayError`] covers startup and CLI failures. Request-scoped
//! failures (body capture, signature verification, per-backend delivery)
//! have their own small enums next to the code that produces them and
//! are mapped to fixed external responses by the proxy handlers — their
//! detail is logged but never surfaced to callers.

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SprayError {
    #[error("webhook verification enabled, but no secret configured")]
    NoSecretConfigured,

    #[error("invalid backend origin '{origin}': {reason}")]
    InvalidOrigin { origin: String, reason: String },

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Invalid URI: {source}")]
    UriParse {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP request failed: {source}")]
    HttpRequest {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Health check failed with status {0}")]
    HealthCheckFailed(hyper::StatusCode),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}
