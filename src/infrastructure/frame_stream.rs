// Server-sent event stream of chart frames, one per accepted sample
use crate::application::chart_service::ChartService;
use crate::application::streaming_service::TelemetryStreamService;
use crate::domain::chart::ChartView;
use crate::domain::connection::ConnectionState;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

/// Render a fresh frame for `view` every time the stream accepts a sample.
/// Slow clients that fall behind skip straight to the latest state. The
/// event stream ends once the telemetry stream is stopped.
pub fn chart_event_stream(
    stream: Arc<TelemetryStreamService>,
    charts: Arc<ChartService>,
    view: ChartView,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let mut ticks = BroadcastStream::new(stream.subscribe());
    let mut state = stream.watch_state();

    async_stream::stream! {
        // Initial frame so the client draws immediately
        if let Some(event) = render_event(&stream, &charts, &view).await {
            yield Ok(event);
        }

        loop {
            let tick = tokio::select! {
                tick = ticks.next() => tick,
                _ = stream_stopped(&mut state) => None,
            };
            let Some(tick) = tick else { break };
            if let Err(BroadcastStreamRecvError::Lagged(skipped)) = tick {
                tracing::debug!("Chart stream subscriber lagged by {} samples", skipped);
            }
            if let Some(event) = render_event(&stream, &charts, &view).await {
                yield Ok(event);
            }
        }
    }
}

async fn stream_stopped(state: &mut watch::Receiver<ConnectionState>) {
    let _ = state.wait_for(|s| *s == ConnectionState::Stopped).await;
}

async fn render_event(
    stream: &TelemetryStreamService,
    charts: &ChartService,
    view: &ChartView,
) -> Option<Event> {
    let frame = {
        let session = stream.session().read().await;
        charts.frame(&session, view, stream.state(), stream.is_paused())
    };
    match Event::default().event("frame").json_data(&frame) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::error!("Failed to serialise chart frame: {}", e);
            None
        }
    }
}

pub fn chart_sse(
    stream: Arc<TelemetryStreamService>,
    charts: Arc<ChartService>,
    view: ChartView,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(chart_event_stream(stream, charts, view)).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::render::ChartGeometry;
    use crate::application::session::TelemetrySession;
    use crate::application::telemetry_transport::{
        TelemetryConnection, TelemetryTransport, TransportError,
    };
    use crate::infrastructure::config::StreamSettings;
    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    struct ChannelTransport(std::sync::Mutex<Option<mpsc::UnboundedReceiver<String>>>);

    #[async_trait]
    impl TelemetryTransport for ChannelTransport {
        async fn connect(&self, url: &str) -> Result<TelemetryConnection, TransportError> {
            match self.0.lock().unwrap().take() {
                Some(rx) => Ok(TelemetryConnection::new(Box::pin(
                    UnboundedReceiverStream::new(rx).map(Ok),
                ))),
                None => Err(TransportError::Connect {
                    url: url.to_string(),
                    reason: "already used".into(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_one_event_per_sample_until_stopped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let service = Arc::new(TelemetryStreamService::start(
            StreamSettings::default(),
            Arc::new(ChannelTransport(std::sync::Mutex::new(Some(rx)))),
            TelemetrySession::shared(600),
        ));
        let charts = Arc::new(ChartService::new(ChartGeometry::default()));
        let events = chart_event_stream(service.clone(), charts, ChartView::default());
        tokio::pin!(events);

        assert!(events.next().await.is_some());
        tx.send(r#"{"status":{"vel_mms":100}}"#.to_string()).unwrap();
        assert!(events.next().await.is_some());

        service.stop().await;
        assert!(events.next().await.is_none());
    }
}
