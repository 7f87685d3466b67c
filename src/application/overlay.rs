// Event overlay tracker - derives markers from the message stream
use crate::domain::marker::{Marker, MarkerKind};
use crate::domain::telemetry::TelemetryFrame;

/// Markers are only pruned once there are more than this many per retained sample.
const PRUNE_FACTOR: usize = 4;

#[derive(Debug, Clone)]
pub struct OverlayTracker {
    markers: Vec<Marker>,
    previous_state: Option<String>,
    retained: usize,
}

impl OverlayTracker {
    /// `retained` is the sample window (buffer capacity) markers must cover.
    pub fn new(retained: usize) -> Self {
        Self {
            markers: Vec::new(),
            previous_state: None,
            retained,
        }
    }

    /// Record markers for a frame already accepted at `index`, then prune.
    /// Returns how many markers the frame produced.
    pub fn observe(&mut self, frame: &TelemetryFrame, index: u64) -> usize {
        let before = self.markers.len();
        let sample = &frame.sample;

        if let Some(tag) = &sample.tag_id {
            self.markers
                .push(Marker::new(index, MarkerKind::Tag, Some(tag.clone())));
        }
        if frame.encoder_reset {
            self.markers
                .push(Marker::new(index, MarkerKind::EncoderReset, None));
        }
        if let Some(state) = &sample.state {
            if self.previous_state.as_ref() != Some(state) {
                self.markers
                    .push(Marker::new(index, MarkerKind::StateChange, Some(state.clone())));
                self.previous_state = Some(state.clone());
            }
        }

        let produced = self.markers.len() - before;
        self.prune(index);
        produced
    }

    fn prune(&mut self, current_index: u64) {
        if self.markers.len() <= self.retained * PRUNE_FACTOR {
            return;
        }
        let min_index = current_index.saturating_sub(self.retained as u64);
        let before = self.markers.len();
        self.markers.retain(|m| m.sample_index >= min_index);
        tracing::debug!(
            "Pruned {} markers older than sample {}",
            before - self.markers.len(),
            min_index
        );
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }
}

#[cfg(test)]
impl OverlayTracker {
    pub fn previous_state(&self) -> Option<&str> {
        self.previous_state.as_deref()
    }
}
