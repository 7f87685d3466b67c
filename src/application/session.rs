// Telemetry session - pipeline and overlay under a single owner
use crate::application::overlay::OverlayTracker;
use crate::application::pipeline::SamplePipeline;
use crate::domain::marker::Marker;
use crate::domain::rolling_buffer::RollingBuffer;
use crate::domain::telemetry::{Channel, SampleAccepted, TelemetryFrame};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared handle; only the stream task takes the write lock.
pub type SharedSession = Arc<RwLock<TelemetrySession>>;

#[derive(Debug, Clone)]
pub struct TelemetrySession {
    pipeline: SamplePipeline,
    overlay: OverlayTracker,
    last_sample_at: Option<DateTime<Utc>>,
}

impl TelemetrySession {
    pub fn new(capacity: usize) -> Self {
        Self {
            pipeline: SamplePipeline::new(capacity),
            overlay: OverlayTracker::new(capacity),
            last_sample_at: None,
        }
    }

    pub fn shared(capacity: usize) -> SharedSession {
        Arc::new(RwLock::new(Self::new(capacity)))
    }

    /// Append the sample, bump the index and record markers against the new index.
    pub fn ingest(&mut self, frame: TelemetryFrame) -> SampleAccepted {
        let index = self.pipeline.append(&frame.sample);
        self.overlay.observe(&frame, index);
        self.last_sample_at = Some(Utc::now());
        SampleAccepted {
            sample: frame.sample,
            index,
        }
    }

    pub fn sample_index(&self) -> u64 {
        self.pipeline.index()
    }

    /// Wall-clock time of the last accepted sample; values shown during an
    /// outage are as old as this.
    pub fn last_sample_at(&self) -> Option<DateTime<Utc>> {
        self.last_sample_at
    }

    pub fn capacity(&self) -> usize {
        self.pipeline.capacity()
    }

    pub fn buffer(&self, channel: Channel) -> &RollingBuffer {
        self.pipeline.buffer(channel)
    }

    pub fn markers(&self) -> &[Marker] {
        self.overlay.markers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::decoder::decode_message;
    use crate::domain::marker::MarkerKind;

    #[test]
    fn test_markers_use_post_increment_index() {
        let mut session = TelemetrySession::new(600);
        assert!(session.last_sample_at().is_none());
        session.ingest(decode_message("{}").unwrap());
        assert!(session.last_sample_at().is_some());
        let accepted = session.ingest(
            decode_message(r#"{"status":{"state":"Load"},"location":{"tag_id":9}}"#).unwrap(),
        );

        assert_eq!(accepted.index, 2);
        assert_eq!(session.markers().len(), 2);
        assert!(session.markers().iter().all(|m| m.sample_index == 2));
        assert_eq!(session.markers()[0].kind, MarkerKind::Tag);
        assert_eq!(session.markers()[1].kind, MarkerKind::StateChange);
    }

    #[test]
    fn test_ramp_scenario() {
        let mut session = TelemetrySession::new(600);
        for n in 1..=650u32 {
            let vel = 5000.0 * f64::from(n - 1) / 649.0;
            let text = format!(r#"{{"status":{{"vel_mms":{}}}}}"#, vel);
            session.ingest(decode_message(&text).unwrap());
        }

        let velocity = session.buffer(Channel::Velocity);
        let expected = |n: u32| 5000.0 * f64::from(n - 1) / 649.0 / 1000.0;
        assert_eq!(velocity.len(), 600);
        assert!((velocity.oldest().unwrap() - expected(51)).abs() < 1e-9);
        assert!((velocity.newest().unwrap() - 5.0).abs() < 1e-9);
        assert!((velocity.newest().unwrap() - expected(650)).abs() < 1e-9);
        assert_eq!(session.sample_index(), 650);
    }
}
