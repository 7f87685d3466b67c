// Chart service - builds renderable chart frames from the live session
use crate::application::render::ChartGeometry;
use crate::application::session::TelemetrySession;
use crate::application::stats::summarize;
use crate::domain::chart::{ChannelPlot, ChartFrame, ChartView};
use crate::domain::connection::ConnectionState;
use crate::domain::telemetry::Channel;

#[derive(Debug, Clone)]
pub struct ChartService {
    geometry: ChartGeometry,
}

impl ChartService {
    pub fn new(geometry: ChartGeometry) -> Self {
        Self { geometry }
    }

    /// Render one frame for `view`. Pure with respect to the session, so it
    /// can run on every accepted sample or on any view change.
    pub fn frame(
        &self,
        session: &TelemetrySession,
        view: &ChartView,
        connection: ConnectionState,
        paused: bool,
    ) -> ChartFrame {
        let window_len = self.geometry.window_len(view.range, session.capacity());

        let channels = Channel::ALL
            .into_iter()
            .map(|channel| {
                let buffer = session.buffer(channel);
                let window = buffer.suffix(window_len);
                let scale = self.geometry.scale(&window, channel);
                let points = if view.channels.shows(channel) {
                    self.geometry.map_points(&window, scale)
                } else {
                    Vec::new()
                };
                let stats = summarize(&window);
                ChannelPlot {
                    channel,
                    unit: channel.unit(),
                    scale,
                    latest: buffer.newest().unwrap_or_default(),
                    points,
                    stats,
                    summary: stats.summary(),
                }
            })
            .collect();

        let markers = self.geometry.place_markers(
            session.markers(),
            &view.overlays,
            session.sample_index(),
            window_len,
        );

        ChartFrame {
            connection,
            paused,
            sample_index: session.sample_index(),
            window_len,
            width: self.geometry.width,
            height: self.geometry.height,
            channels,
            markers,
        }
    }
}
