use serde::{Deserialize, Serialize};

/// Event delivered to real-time subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastEvent {
    pub event: String,
    pub collection: String,
    /// Relay-local timestamp, unix ms.
    pub ts_ms: i64,
    pub payload: serde_json::Value,
}

/// Fan-out publish primitive to all connected subscribers.
///
/// Fire-and-forget: no acknowledgment or backpressure is reported back,
/// so `emit` must not block.
pub trait BroadcastSink: Send + Sync {
    fn emit(&self, event: BroadcastEvent);
}
