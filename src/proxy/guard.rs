//! Inbound body capture behind a size limit.
//!
//! An HTTP body stream can be read only once, but a broadcast needs one
//! outbound copy per backend. [`capture`] buffers the whole body into an
//! owned [`Bytes`] exactly once, through a reader bounded by the
//! configured maximum, and every per-backend attempt then gets its own
//! cheap view over the same bytes.

use axum::body::Body;
use bytes::Bytes;
use http_body_util::{BodyExt, Limited};

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("request body too large or unreadable: {source}")]
    RequestTooLarge {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Read the inbound body in full, up to `limit` bytes inclusive.
///
/// Any read failure maps to [`GuardError::RequestTooLarge`]; a body the
/// proxy could not buffer is treated the same as one over the limit.
pub async fn capture(body: Body, limit: usize) -> Result<Bytes, GuardError> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(source) => Err(GuardError::RequestTooLarge { source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn body_at_limit_is_accepted() {
        let payload = vec![0x61u8; 64];
        let body = Body::from(payload.clone());
        let captured = capture(body, 64).await.unwrap();
        assert_eq!(captured.as_ref(), payload.as_slice());
    }

    #[tokio::test]
    async fn body_over_limit_is_rejected() {
        let body = Body::from(vec![0x61u8; 65]);
        assert!(capture(body, 64).await.is_err());
    }

    #[tokio::test]
    async fn empty_body_is_accepted() {
        let captured = capture(Body::empty(), 64).await.unwrap();
        assert!(captured.is_empty());
    }
}
