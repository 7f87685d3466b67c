// Telemetry sample domain models
use serde::Serialize;

/// Millimetre-based feed values are divided by this to get SI units.
pub const MILLI_PER_UNIT: f64 = 1000.0;

/// One decoded telemetry reading, already converted to metres.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub velocity: f64,
    pub acceleration: f64,
    pub position: f64,
    pub tag_id: Option<String>,
    pub state: Option<String>,
}

impl Sample {
    pub fn new(velocity: f64, acceleration: f64, position: f64) -> Self {
        Self {
            velocity,
            acceleration,
            position,
            tag_id: None,
            state: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Velocity,
    Acceleration,
    Position,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Velocity, Channel::Acceleration, Channel::Position];

    pub fn unit(self) -> &'static str {
        match self {
            Channel::Velocity => "m/s",
            Channel::Acceleration => "m/s²",
            Channel::Position => "m",
        }
    }
}

/// Everything one inbound message carries: the sample plus event flags
/// that have no place in the continuous channels.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryFrame {
    pub sample: Sample,
    pub encoder_reset: bool,
}

#[cfg(test)]
impl TelemetryFrame {
    pub fn new(sample: Sample) -> Self {
        Self {
            sample,
            encoder_reset: false,
        }
    }
}

/// Event emitted once per accepted sample, carrying its post-increment index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleAccepted {
    pub sample: Sample,
    pub index: u64,
}
