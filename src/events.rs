//! Bus topics and event payloads exchanged with the host.
//!
//! The host delivers two kinds of traffic: JSON control events announcing a
//! new preview stream, and raw binary messages carrying one encoded frame
//! each (layout in [`crate::core::wire`]).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Control topic: a producer starts (or restarts) a preview stream.
pub const STREAM_ANNOUNCE: &str = "stream-announce";

/// Binary topic: one frame of preview data.
pub const FRAME_DATA: &str = "frame-data";

/// Announcement payload. Fields default when missing so a sparse JSON
/// object from an older producer still parses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamAnnounce {
    /// Composite node path of the producer; empty means ignore.
    pub id: String,
    /// Declared frame count of the stream.
    pub length: usize,
    /// Requested playback rate; 0 = use the built-in default.
    pub rate: f32,
}

impl Default for StreamAnnounce {
    fn default() -> Self {
        Self {
            id: String::new(),
            length: 0,
            rate: 0.0,
        }
    }
}

impl StreamAnnounce {
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// One event on the bus.
#[derive(Debug, Clone)]
pub enum BusEvent {
    Announce(StreamAnnounce),
    /// Raw frame-data payload; shared so handlers can hold it past the
    /// emission without copying.
    Binary(Arc<[u8]>),
}

impl BusEvent {
    pub fn binary(bytes: Vec<u8>) -> Self {
        BusEvent::Binary(Arc::from(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn announce_parses_sparse_json() {
        let v = serde_json::json!({ "id": "sub1:n5" });
        let a = StreamAnnounce::from_json(&v).unwrap();
        assert_eq!(a.id, "sub1:n5");
        assert_eq!(a.length, 0);
        assert_eq!(a.rate, 0.0);
    }

    #[test]
    fn announce_roundtrips() {
        let a = StreamAnnounce {
            id: "n1".into(),
            length: 3,
            rate: 10.0,
        };
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(StreamAnnounce::from_json(&v).unwrap(), a);
    }
}
