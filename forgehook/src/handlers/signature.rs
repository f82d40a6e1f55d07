//! Webhook signature verification
//!
//! When a shared secret is configured, the `X-Webhook-Signature` header must
//! equal the hex-encoded HMAC-SHA256 of the raw request body keyed by that
//! secret. Verification runs over the exact bytes received, before any JSON
//! interpretation, and comparison is constant time. Without a configured
//! secret, any signature (or none) is accepted.

use crate::error::ApiError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// Verify the webhook signature against the raw request body.
///
/// # Errors
///
/// Returns [`ApiError::Signature`] when a secret is configured and the
/// header is missing, malformed, or does not match.
pub fn verify(
    secret: Option<&str>,
    signature: Option<&str>,
    body: &[u8],
) -> Result<(), ApiError> {
    let Some(secret) = secret else {
        debug!("webhook signature verification disabled (no secret configured)");
        return Ok(());
    };

    let Some(signature) = signature else {
        warn!("webhook signature missing but secret is configured");
        return Err(ApiError::Signature("missing webhook signature".to_string()));
    };

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ApiError::Signature("invalid webhook secret".to_string()))?;
    mac.update(body);

    let provided = hex::decode(signature)
        .map_err(|_| ApiError::Signature("malformed webhook signature".to_string()))?;

    mac.verify_slice(&provided).map_err(|_| {
        warn!("webhook signature verification failed");
        ApiError::Signature("invalid webhook signature".to_string())
    })?;

    debug!("webhook signature verified");
    Ok(())
}
