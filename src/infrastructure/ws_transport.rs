// WebSocket transport for the telemetry stream
use crate::application::telemetry_transport::{
    TelemetryConnection, TelemetryTransport, TransportError,
};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

/// Text payload of a data frame; control frames carry none.
fn frame_text(message: Message) -> Option<String> {
    match message {
        Message::Text(text) => Some(text),
        Message::Binary(bytes) => String::from_utf8(bytes).ok(),
        Message::Close(frame) => {
            tracing::debug!("Telemetry stream received close frame: {:?}", frame);
            None
        }
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
    }
}

#[async_trait]
impl TelemetryTransport for WebSocketTransport {
    async fn connect(&self, url: &str) -> Result<TelemetryConnection, TransportError> {
        let (socket, response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        tracing::debug!(
            "WebSocket handshake with {} completed ({})",
            url,
            response.status()
        );

        let (mut sink, stream) = socket.split();

        // Pings are answered by tungstenite while the stream is polled
        let messages = stream.filter_map(|item| async move {
            match item {
                Ok(message) => frame_text(message).map(Ok),
                Err(e) => Some(Err(TransportError::Protocol(e.to_string()))),
            }
        });

        let close = async move {
            match tokio::time::timeout(CLOSE_TIMEOUT, sink.send(Message::Close(None))).await {
                Ok(Ok(())) => tracing::debug!("Sent close frame to telemetry stream"),
                Ok(Err(e)) => tracing::debug!("Could not send close frame: {}", e),
                Err(_) => tracing::debug!("Timed out sending close frame"),
            }
        };

        Ok(TelemetryConnection::new(messages.boxed()).with_close(close))
    }
}
