// Chart view models produced by the render engine
use super::connection::ConnectionState;
use super::marker::MarkerKind;
use super::telemetry::Channel;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ChannelStats {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

impl ChannelStats {
    /// Two-decimal summary line as shown under the chart.
    pub fn summary(&self) -> String {
        format!(
            "min: {:.2} • avg: {:.2} • max: {:.2}",
            self.min, self.avg, self.max
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelPlot {
    pub channel: Channel,
    pub unit: &'static str,
    pub scale: f64,
    /// Most recent value in the buffer.
    pub latest: f64,
    /// Empty when the channel is hidden.
    pub points: Vec<PlotPoint>,
    pub stats: ChannelStats,
    /// `stats` formatted for display.
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedMarker {
    pub kind: MarkerKind,
    pub label: Option<String>,
    pub sample_index: u64,
    pub x: f64,
}

/// Everything needed to draw one frame of the realtime chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartFrame {
    pub connection: ConnectionState,
    pub paused: bool,
    pub sample_index: u64,
    pub window_len: usize,
    pub width: f64,
    pub height: f64,
    pub channels: Vec<ChannelPlot>,
    pub markers: Vec<PlacedMarker>,
}

/// How much of the retained history the chart shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSelection {
    Seconds(u32),
    /// Everything retained in the rolling buffers.
    Live,
}

impl Default for RangeSelection {
    fn default() -> Self {
        RangeSelection::Seconds(30)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid range selection {0:?}, expected a positive number of seconds or \"live\"")]
pub struct InvalidRange(pub String);

impl std::str::FromStr for RangeSelection {
    type Err = InvalidRange;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("live") || trimmed.eq_ignore_ascii_case("all") {
            return Ok(RangeSelection::Live);
        }
        match trimmed.parse::<u32>() {
            Ok(seconds) if seconds > 0 => Ok(RangeSelection::Seconds(seconds)),
            _ => Err(InvalidRange(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSelection {
    pub velocity: bool,
    pub acceleration: bool,
    pub position: bool,
}

impl Default for ChannelSelection {
    fn default() -> Self {
        Self {
            velocity: true,
            acceleration: true,
            position: true,
        }
    }
}

impl ChannelSelection {
    pub fn shows(&self, channel: Channel) -> bool {
        match channel {
            Channel::Velocity => self.velocity,
            Channel::Acceleration => self.acceleration,
            Channel::Position => self.position,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlaySelection {
    pub tag: bool,
    pub encoder_reset: bool,
    pub state_change: bool,
}

impl Default for OverlaySelection {
    fn default() -> Self {
        Self {
            tag: true,
            encoder_reset: true,
            state_change: true,
        }
    }
}

impl OverlaySelection {
    pub fn shows(&self, kind: MarkerKind) -> bool {
        match kind {
            MarkerKind::Tag => self.tag,
            MarkerKind::EncoderReset => self.encoder_reset,
            MarkerKind::StateChange => self.state_change,
        }
    }
}

/// User-controlled view options for one render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChartView {
    pub range: RangeSelection,
    pub channels: ChannelSelection,
    pub overlays: OverlaySelection,
}
