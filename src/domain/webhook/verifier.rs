//! Webhook signature verification.
//!
//! The processor signs each delivery with HMAC-SHA256 over the raw
//! request body using a shared secret, hex-encoded into the
//! `X-Signature` header. Verification must happen on the raw bytes
//! before any parsing.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::event::GatewayEvent;
use super::errors::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Verifier for processor webhook signatures.
pub struct WebhookVerifier {
    /// The webhook signing secret shared with the processor.
    secret: String,
}

impl WebhookVerifier {
    /// Creates a new verifier with the given signing secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verifies the signature and parses the event envelope.
    ///
    /// # Errors
    ///
    /// - `InvalidSignature` - header missing, malformed hex, or mismatch
    /// - `ParseError` - verified payload is not a valid event envelope
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<GatewayEvent, WebhookError> {
        let claimed = hex::decode(signature_header.trim())
            .map_err(|_| WebhookError::InvalidSignature)?;

        let expected = self.compute_signature(payload);

        if !constant_time_compare(&expected, &claimed) {
            return Err(WebhookError::InvalidSignature);
        }

        let event: GatewayEvent = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        Ok(event)
    }

    /// Computes the HMAC-SHA256 signature over the raw payload.
    fn compute_signature(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Constant-time comparison of two byte slices.
///
/// Prevents timing attacks that could leak the expected signature.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes a hex signature for use in test fixtures.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}
