// Window statistics aggregator
use crate::domain::chart::ChannelStats;

/// min/avg/max over a window; an empty window summarises to all zeros.
pub fn summarize(window: &[f64]) -> ChannelStats {
    if window.is_empty() {
        return ChannelStats::default();
    }
    let (min, max, sum) = window.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, 0.0),
        |(min, max, sum), &v| (min.min(v), max.max(v), sum + v),
    );
    ChannelStats {
        min,
        avg: sum / window.len() as f64,
        max,
    }
}
