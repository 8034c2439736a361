//! Inbound events — deliveries that have cleared the authenticity gate.
//!
//! An [`InboundEvent`] is the hand-off unit between the trust boundary and
//! the message-routing layer. It is created only after signature
//! verification has passed; nothing upstream of the gate constructs one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A verified webhook delivery, parsed and ready for routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Unique id assigned at acceptance time.
    pub id: Uuid,

    /// When the gateway accepted the delivery.
    pub received_at: DateTime<Utc>,

    /// The parsed payload. Parsing happens strictly after verification —
    /// the signature is always computed over the raw bytes, never over a
    /// re-serialization of this value.
    pub payload: serde_json::Value,
}

impl InboundEvent {
    /// Wrap a verified, parsed payload with a fresh id and timestamp.
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            received_at: Utc::now(),
            payload,
        }
    }
}
