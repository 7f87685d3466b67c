// Render/scale engine - maps sample windows and markers to plot coordinates
use crate::domain::chart::{OverlaySelection, PlacedMarker, PlotPoint, RangeSelection};
use crate::domain::marker::Marker;
use crate::domain::telemetry::Channel;

/// Plot surface and per-channel vertical ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartGeometry {
    pub width: f64,
    pub height: f64,
    pub offset_y: f64,
    pub epsilon: f64,
    pub sample_rate_hz: f64,
    pub velocity_range: f64,
    pub acceleration_range: f64,
    pub position_range: f64,
}

impl Default for ChartGeometry {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 256.0,
            offset_y: 128.0,
            epsilon: 0.001,
            sample_rate_hz: 10.0,
            velocity_range: 64.0,
            acceleration_range: 51.2,
            position_range: 96.0,
        }
    }
}

impl ChartGeometry {
    pub fn base_range(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Velocity => self.velocity_range,
            Channel::Acceleration => self.acceleration_range,
            Channel::Position => self.position_range,
        }
    }

    /// Number of trailing samples shown for `range`, never more than `capacity`.
    pub fn window_len(&self, range: RangeSelection, capacity: usize) -> usize {
        match range {
            RangeSelection::Live => capacity,
            RangeSelection::Seconds(seconds) => {
                let samples = (f64::from(seconds) * self.sample_rate_hz).round() as usize;
                samples.min(capacity)
            }
        }
    }

    pub fn scale(&self, window: &[f64], channel: Channel) -> f64 {
        compute_scale(window, self.base_range(channel), self.epsilon)
    }

    pub fn step_x(&self, window_len: usize) -> f64 {
        if window_len < 2 {
            0.0
        } else {
            self.width / (window_len - 1) as f64
        }
    }

    pub fn map_points(&self, window: &[f64], scale: f64) -> Vec<PlotPoint> {
        let step = self.step_x(window.len());
        window
            .iter()
            .enumerate()
            .map(|(i, v)| PlotPoint {
                x: i as f64 * step,
                y: self.offset_y - v * scale,
            })
            .collect()
    }

    /// Position markers against a window of `window_len` samples ending at
    /// `current_index`. Markers older than the window start are skipped.
    pub fn place_markers(
        &self,
        markers: &[Marker],
        overlays: &OverlaySelection,
        current_index: u64,
        window_len: usize,
    ) -> Vec<PlacedMarker> {
        if window_len == 0 {
            return Vec::new();
        }
        let start = window_start_index(current_index, window_len);
        let step = self.step_x(window_len);
        markers
            .iter()
            .filter(|m| overlays.shows(m.kind))
            .filter(|m| i128::from(m.sample_index) >= start)
            .map(|m| PlacedMarker {
                kind: m.kind,
                label: m.label.clone(),
                sample_index: m.sample_index,
                x: (i128::from(m.sample_index) - start) as f64 * step,
            })
            .collect()
    }
}

/// `base / max(epsilon, max |v|)`; finite for any finite window.
pub fn compute_scale(window: &[f64], base: f64, epsilon: f64) -> f64 {
    let peak = window.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    base / peak.max(epsilon)
}

/// Sample index held by the first position of the window. Can be zero or
/// negative while the buffer still contains its initial zero fill.
pub fn window_start_index(current_index: u64, window_len: usize) -> i128 {
    i128::from(current_index) - window_len as i128 + 1
}
