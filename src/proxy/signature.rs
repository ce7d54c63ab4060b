//! Webhook signature verification.
//!
//! GitHub-style webhooks sign the raw request body with HMAC-SHA256 and
//! carry the digest in the `x-hub-signature-256` header as
//! `sha256=<lowercase hex>`. Verification uses a constant-time
//! comparison; callers map both failure cases to the same generic 400 so
//! the response never acts as an oracle.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing webhook signature header")]
    MissingSignature,

    #[error("invalid webhook signature")]
    InvalidSignature,
}

/// Validate the signature header against the captured body and secret.
pub fn verify(headers: &HeaderMap, body: &[u8], secret: &str) -> Result<(), SignatureError> {
    let header = match headers.get(SIGNATURE_HEADER) {
        None => return Err(SignatureError::MissingSignature),
        Some(value) => value
            .to_str()
            .map_err(|_| SignatureError::InvalidSignature)?,
    };
    if header.is_empty() {
        return Err(SignatureError::MissingSignature);
    }

    let hex_digest = header
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or(SignatureError::InvalidSignature)?;
    let digest = hex::decode(hex_digest).map_err(|_| SignatureError::InvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::InvalidSignature)?;
    mac.update(body);
    // verify_slice compares in constant time
    mac.verify_slice(&digest)
        .map_err(|_| SignatureError::InvalidSignature)
}

/// Compute the signature header value a sender would attach for `body`.
/// Used by tests and by receivers that want to self-sign requests.
#[must_use]
pub fn sign(body: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}
