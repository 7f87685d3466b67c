// Discrete event markers overlaid on the sample stream
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// RFID tag read
    Tag,
    EncoderReset,
    StateChange,
}

/// A point-in-time annotation positioned by sample index rather than time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub sample_index: u64,
    pub kind: MarkerKind,
    pub label: Option<String>,
}

impl Marker {
    pub fn new(sample_index: u64, kind: MarkerKind, label: Option<String>) -> Self {
        Self {
            sample_index,
            kind,
            label,
        }
    }
}
