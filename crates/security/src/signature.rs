//! Inbound authenticity gate — HMAC-SHA256 webhook signature verification.
//!
//! Every inbound webhook delivery must prove it originated from the
//! configured sender before it reaches business logic. The sender signs the
//! exact raw request body with a shared secret and sends the digest in the
//! `x-hub-signature-256` header as `sha256=<hex>`.
//!
//! Verification runs over the raw bytes as delivered. Re-serializing a
//! parsed payload produces different bytes and breaks verification
//! deterministically — that is an environment defect, not a forgery.
//!
//! Uses constant-time comparison to prevent timing attacks.

use hmac::{Hmac, Mac};
use relaycrm_core::GateError;
use sha2::Sha256;
use tracing::{error, warn};

type HmacSha256 = Hmac<Sha256>;

/// Request header carrying the sender's signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Scheme prefix on the header value.
const SIGNATURE_PREFIX: &str = "sha256=";

/// Compute the signature header value for a payload: `sha256=<hex digest>`.
///
/// This is what the sender computes; the gate recomputes it server-side.
/// Also used by the `relaycrm sign` command for debugging integrations.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

/// Verify an inbound delivery against the shared signing secret.
///
/// Checks run in order; the first failing condition wins:
/// 1. signature header absent → [`GateError::MissingSignature`]
/// 2. raw body unavailable → [`GateError::MissingRawBody`] (transport
///    misconfiguration — the body must be captured before any parsing)
/// 3. secret unconfigured or empty → [`GateError::MissingSecret`] (never
///    verify against an empty or default secret)
/// 4. digest mismatch, missing `sha256=` prefix, or non-hex digest →
///    [`GateError::SignatureMismatch`]
///
/// On success the request proceeds unchanged; the gate mutates nothing.
/// The computed digest is never logged.
pub fn verify_signature(
    signature_header: Option<&str>,
    raw_body: Option<&[u8]>,
    signing_secret: Option<&str>,
) -> Result<(), GateError> {
    let Some(signature) = signature_header else {
        warn!("webhook rejected: no {SIGNATURE_HEADER} header");
        return Err(GateError::MissingSignature);
    };

    let Some(payload) = raw_body else {
        error!("webhook raw body not captured — transport layer misconfigured");
        return Err(GateError::MissingRawBody);
    };

    let secret = match signing_secret {
        Some(s) if !s.is_empty() => s,
        _ => {
            error!("webhook signing secret not configured");
            return Err(GateError::MissingSecret);
        }
    };

    let Some(sig_hex) = signature.strip_prefix(SIGNATURE_PREFIX) else {
        warn!("webhook rejected: signature header not in sha256=<hex> form");
        return Err(GateError::SignatureMismatch);
    };

    let provided = match hex::decode(sig_hex) {
        Ok(bytes) => bytes,
        Err(_) => {
            warn!("webhook rejected: signature digest is not valid hex");
            return Err(GateError::SignatureMismatch);
        }
    };

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);

    // Constant-time comparison via `verify_slice`
    if mac.verify_slice(&provided).is_err() {
        warn!(payload_len = payload.len(), "webhook rejected: signature mismatch");
        return Err(GateError::SignatureMismatch);
    }

    Ok(())
}
