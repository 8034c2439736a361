//! Security module for RelayCRM — the trust boundary of the platform.
//!
//! Provides:
//! - **Signature**: Verify HMAC-SHA256 signatures on inbound webhook
//!   deliveries before any business logic runs
//! - **Cipher**: Encrypt/decrypt platform access tokens and other
//!   credentials at rest
//!
//! Both components are pure functions over process-lifetime configuration:
//! no per-call shared state, safe to invoke concurrently without locking.

pub mod cipher;
pub mod signature;

pub use cipher::CredentialCipher;
pub use signature::{SIGNATURE_HEADER, sign_payload, verify_signature};
