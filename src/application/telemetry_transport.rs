// Transport trait for the telemetry stream connection
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use std::future::Future;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("stream protocol error: {0}")]
    Protocol(String),
}

/// Inbound text messages in arrival order. The stream ending means the peer
/// closed the connection; an `Err` item means the connection failed.
pub type MessageStream = BoxStream<'static, Result<String, TransportError>>;

/// One open connection: the inbound messages plus an optional close
/// handshake run when the client hangs up.
pub struct TelemetryConnection {
    pub messages: MessageStream,
    close: Option<BoxFuture<'static, ()>>,
}

impl TelemetryConnection {
    pub fn new(messages: MessageStream) -> Self {
        Self {
            messages,
            close: None,
        }
    }

    pub fn with_close<F>(mut self, close: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.close = Some(close.boxed());
        self
    }

    /// Stop reading and tell the peer we are going away.
    pub async fn close(self) {
        drop(self.messages);
        if let Some(close) = self.close {
            close.await;
        }
    }
}

#[async_trait]
pub trait TelemetryTransport: Send + Sync {
    /// Open one streaming connection to `url`.
    async fn connect(&self, url: &str) -> Result<TelemetryConnection, TransportError>;
}
