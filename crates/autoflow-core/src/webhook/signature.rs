//! Webhook signature verification.
//!
//! Validates that an inbound request body was produced by the expected
//! sender: an HMAC-SHA256 digest is computed over the raw body using the
//! shared secret and compared against the claimed `sha256=<hex>` header
//! value in constant time.
//!
//! Three failure conditions are kept distinguishable:
//!
//! | Condition | Error | HTTP class |
//! |-----------|-------|------------|
//! | No secret configured | [`IntakeError::Misconfigured`] | 500 |
//! | No signature header | [`IntakeError::Malformed`] | 400 |
//! | Digest mismatch / bad hex | [`IntakeError::Unauthenticated`] | 401 |

use crate::webhook::IntakeError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::instrument;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// Hex-digest prefix used by GitHub-style signature headers.
const SIGNATURE_PREFIX: &str = "sha256=";

// ============================================================================
// WebhookSecret
// ============================================================================

/// Shared webhook secret, zeroized on drop and redacted in `Debug` output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    /// Wrap a raw secret value (not Base64 or hex-encoded)
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("WebhookSecret").field(&"<REDACTED>").finish()
    }
}

// ============================================================================
// SignatureVerifier
// ============================================================================

/// Authenticity check for inbound webhook bodies.
///
/// Constructed once at startup from configuration. A verifier without a
/// secret rejects every request as `Misconfigured` rather than silently
/// accepting unsigned traffic.
pub struct SignatureVerifier {
    secret: Option<WebhookSecret>,
}

impl SignatureVerifier {
    /// Create a verifier from the optionally-configured secret
    pub fn new(secret: Option<WebhookSecret>) -> Self {
        Self { secret }
    }

    /// Verify the claimed signature against the raw request body.
    ///
    /// `body` must be the exact bytes as received, not a re-serialization.
    /// The `sha256=` prefix is stripped from the header value if present.
    ///
    /// The digest comparison goes through [`Mac::verify_slice`], which is
    /// constant-time and treats a length mismatch as verification failure
    /// rather than a panic.
    #[instrument(skip_all, fields(body_len = body.len()))]
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<(), IntakeError> {
        let secret = self
            .secret
            .as_ref()
            .ok_or_else(|| IntakeError::Misconfigured {
                message: "webhook secret is not configured".to_string(),
            })?;

        let signature =
            signature.ok_or_else(|| IntakeError::malformed("missing signature header"))?;

        let hex_part = signature
            .strip_prefix(SIGNATURE_PREFIX)
            .unwrap_or(signature);
        let claimed = hex::decode(hex_part).map_err(|_| IntakeError::Unauthenticated)?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| {
            IntakeError::Misconfigured {
                message: "webhook secret cannot be used as an HMAC key".to_string(),
            }
        })?;
        mac.update(body);

        mac.verify_slice(&claimed)
            .map_err(|_| IntakeError::Unauthenticated)
    }
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
