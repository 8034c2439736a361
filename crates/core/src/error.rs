//! Error types for the RelayCRM trust boundary.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all RelayCRM operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Inbound authenticity gate ---
    #[error("Gate error: {0}")]
    Gate(#[from] GateError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of the inbound authenticity gate, ordered by check sequence.
///
/// The two configuration defects (`MissingRawBody`, `MissingSecret`) are
/// 500-class: they indicate a mis-wired deployment, not a hostile caller,
/// and must stay distinguishable from the 401/403 authentication failures
/// in logs and metrics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("webhook signature header missing")]
    MissingSignature,

    #[error("raw request body unavailable — transport layer misconfigured")]
    MissingRawBody,

    #[error("webhook signing secret not configured")]
    MissingSecret,

    #[error("webhook signature mismatch")]
    SignatureMismatch,
}

impl GateError {
    /// Whether this failure is a deployment defect rather than a client error.
    pub fn is_config_defect(&self) -> bool {
        matches!(self, Self::MissingRawBody | Self::MissingSecret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_error_displays_correctly() {
        let err = Error::Gate(GateError::SignatureMismatch);
        assert!(err.to_string().contains("signature mismatch"));
    }

    #[test]
    fn config_defects_are_flagged() {
        assert!(GateError::MissingRawBody.is_config_defect());
        assert!(GateError::MissingSecret.is_config_defect());
        assert!(!GateError::MissingSignature.is_config_defect());
        assert!(!GateError::SignatureMismatch.is_config_defect());
    }
}
