// Streaming service - owns the telemetry connection and the session it feeds
use crate::application::backoff::Backoff;
use crate::application::decoder::decode_message;
use crate::application::session::SharedSession;
use crate::application::telemetry_transport::{TelemetryConnection, TelemetryTransport};
use crate::domain::connection::ConnectionState;
use crate::domain::telemetry::SampleAccepted;
use crate::infrastructure::config::StreamSettings;
use futures::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Handle to the background task that keeps one telemetry connection alive.
///
/// The task is the only writer of the session: every accepted message is
/// decoded, appended and annotated there, in arrival order. Everything on
/// this handle is safe to call from any task.
pub struct TelemetryStreamService {
    session: SharedSession,
    flags: Arc<StreamFlags>,
    state: watch::Receiver<ConnectionState>,
    events: broadcast::Sender<SampleAccepted>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct StreamFlags {
    paused: AtomicBool,
    stopped: AtomicBool,
    state: watch::Sender<ConnectionState>,
}

impl StreamFlags {
    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Publish a transition; nothing moves the state out of `Stopped`.
    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == next || *current == ConnectionState::Stopped {
                return false;
            }
            *current = next;
            true
        });
    }
}

enum Disconnect {
    Closed,
    Failed,
    Shutdown,
}

impl TelemetryStreamService {
    /// Spawn the connection task. Must be called inside a tokio runtime.
    pub fn start(
        settings: StreamSettings,
        transport: Arc<dyn TelemetryTransport>,
        session: SharedSession,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let flags = Arc::new(StreamFlags {
            paused: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            state: state_tx,
        });

        let worker = StreamWorker {
            url: settings.endpoint().to_string(),
            backoff: settings.backoff(),
            transport,
            session: session.clone(),
            flags: flags.clone(),
            events: events.clone(),
            shutdown: shutdown_rx,
        };
        let task = tokio::spawn(worker.run());

        Self {
            session,
            flags,
            state: state_rx,
            events,
            shutdown: shutdown_tx,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// One event per accepted sample, in processing order.
    pub fn subscribe(&self) -> broadcast::Receiver<SampleAccepted> {
        self.events.subscribe()
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Keep the connection but discard inbound samples until `resume`.
    pub fn pause(&self) {
        if !self.flags.paused.swap(true, Ordering::SeqCst) {
            tracing::info!("Telemetry stream paused");
        }
    }

    pub fn resume(&self) {
        if self.flags.paused.swap(false, Ordering::SeqCst) {
            tracing::info!("Telemetry stream resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.flags.is_paused()
    }

    /// Close the connection and cancel any pending reconnect. Idempotent.
    pub async fn stop(&self) {
        let first = !self.flags.stopped.swap(true, Ordering::SeqCst);
        self.shutdown.send_replace(true);

        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!("Telemetry stream task ended abnormally: {}", e);
            }
        }

        self.flags.set_state(ConnectionState::Stopped);
        if first {
            tracing::info!("Telemetry stream stopped");
        }
    }
}

struct StreamWorker {
    url: String,
    backoff: Backoff,
    transport: Arc<dyn TelemetryTransport>,
    session: SharedSession,
    flags: Arc<StreamFlags>,
    events: broadcast::Sender<SampleAccepted>,
    shutdown: watch::Receiver<bool>,
}

impl StreamWorker {
    async fn run(mut self) {
        while !self.flags.is_stopped() {
            self.flags.set_state(ConnectionState::Connecting);
            tracing::info!("Connecting to telemetry stream at {}", self.url);

            let connected = tokio::select! {
                biased;
                _ = shutdown_requested(&mut self.shutdown) => break,
                result = self.transport.connect(&self.url) => result,
            };

            let outcome = match connected {
                Ok(connection) => {
                    self.flags.set_state(ConnectionState::Connected);
                    self.backoff.reset();
                    tracing::info!("Telemetry stream connected");
                    self.pump(connection).await
                }
                Err(e) => {
                    tracing::warn!("Telemetry stream connect failed: {}", e);
                    Disconnect::Failed
                }
            };

            match outcome {
                Disconnect::Shutdown => break,
                Disconnect::Closed => self.flags.set_state(ConnectionState::Closed),
                Disconnect::Failed => self.flags.set_state(ConnectionState::Error),
            }

            let delay = self.backoff.next_delay();
            tracing::warn!(
                "Telemetry stream down, reconnecting in {}ms (attempt {})",
                delay.as_millis(),
                self.backoff.attempt()
            );

            tokio::select! {
                biased;
                _ = shutdown_requested(&mut self.shutdown) => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.flags.set_state(ConnectionState::Stopped);
        tracing::debug!("Telemetry stream task exiting");
    }

    /// Drain one connection. On shutdown the stream is not polled again, so
    /// no message is handled after teardown, and the connection is closed.
    async fn pump(&mut self, mut connection: TelemetryConnection) -> Disconnect {
        loop {
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut self.shutdown) => break,
                next = connection.messages.next() => match next {
                    Some(Ok(text)) => self.handle_message(&text).await,
                    Some(Err(e)) => {
                        tracing::warn!("Telemetry stream error: {}", e);
                        return Disconnect::Failed;
                    }
                    None => {
                        tracing::info!("Telemetry stream closed by peer");
                        return Disconnect::Closed;
                    }
                },
            }
        }

        connection.close().await;
        Disconnect::Shutdown
    }

    async fn handle_message(&mut self, text: &str) {
        if self.flags.is_stopped() {
            return;
        }

        let frame = match decode_message(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!("Dropping undecodable telemetry message: {}", e);
                return;
            }
        };

        if self.flags.is_paused() {
            return;
        }

        let accepted = self.session.write().await.ingest(frame);
        // No subscribers is fine
        let _ = self.events.send(accepted);
    }
}

/// Resolves once shutdown was requested or the service handle is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session::TelemetrySession;
    use crate::application::telemetry_transport::{MessageStream, TransportError};
    use crate::domain::telemetry::Channel;
    use async_trait::async_trait;
    use futures::stream;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::Instant;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    enum Script {
        Refuse,
        /// Deliver the messages, then close.
        Close(Vec<String>),
        /// Deliver the messages, then fail.
        Fail(Vec<String>),
        /// Messages come from the test through a channel.
        Live(mpsc::UnboundedReceiver<String>),
    }

    /// Plays back one script per connect call; refuses once exhausted.
    #[derive(Default)]
    struct ScriptedTransport {
        scripts: std::sync::Mutex<VecDeque<Script>>,
        attempts: std::sync::Mutex<Vec<Instant>>,
        closes: Arc<AtomicUsize>,
    }

    impl ScriptedTransport {
        fn new(scripts: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                scripts: std::sync::Mutex::new(scripts.into()),
                attempts: std::sync::Mutex::new(Vec::new()),
                closes: Arc::new(AtomicUsize::new(0)),
            })
        }

        fn attempt_gaps_ms(&self) -> Vec<u128> {
            let attempts = self.attempts.lock().unwrap();
            attempts
                .windows(2)
                .map(|w| (w[1] - w[0]).as_millis())
                .collect()
        }

        fn attempt_count(&self) -> usize {
            self.attempts.lock().unwrap().len()
        }

        fn close_count(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TelemetryTransport for ScriptedTransport {
        async fn connect(&self, url: &str) -> Result<TelemetryConnection, TransportError> {
            self.attempts.lock().unwrap().push(Instant::now());
            let script = self.scripts.lock().unwrap().pop_front();
            let messages: MessageStream = match script.unwrap_or(Script::Refuse) {
                Script::Refuse => {
                    return Err(TransportError::Connect {
                        url: url.to_string(),
                        reason: "connection refused".into(),
                    });
                }
                Script::Close(messages) => stream::iter(messages.into_iter().map(Ok)).boxed(),
                Script::Fail(messages) => stream::iter(messages.into_iter().map(Ok))
                    .chain(stream::once(async {
                        Err(TransportError::Protocol("reset by peer".into()))
                    }))
                    .boxed(),
                Script::Live(rx) => UnboundedReceiverStream::new(rx).map(Ok).boxed(),
            };

            let closes = self.closes.clone();
            Ok(TelemetryConnection::new(messages).with_close(async move {
                closes.fetch_add(1, Ordering::SeqCst);
            }))
        }
    }

    fn velocity(vel_mms: i64) -> String {
        format!(r#"{{"status":{{"vel_mms":{}}}}}"#, vel_mms)
    }

    fn start(transport: Arc<ScriptedTransport>) -> TelemetryStreamService {
        TelemetryStreamService::start(
            StreamSettings::default(),
            transport,
            TelemetrySession::shared(600),
        )
    }

    async fn wait_for_state(service: &TelemetryStreamService, wanted: ConnectionState) {
        let mut rx = service.watch_state();
        rx.wait_for(|s| *s == wanted).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_between_attempts() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let transport = ScriptedTransport::new(vec![
            Script::Refuse,
            Script::Refuse,
            Script::Refuse,
            Script::Refuse,
            Script::Refuse,
            Script::Refuse,
            Script::Live(rx),
        ]);
        let service = start(transport.clone());

        wait_for_state(&service, ConnectionState::Connected).await;
        assert_eq!(
            transport.attempt_gaps_ms(),
            vec![500, 1000, 2000, 4000, 5000, 5000]
        );
        service.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_resets_after_open() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let transport = ScriptedTransport::new(vec![
            Script::Refuse,
            Script::Refuse,
            Script::Close(vec![]),
            Script::Refuse,
            Script::Live(rx),
        ]);
        let service = start(transport.clone());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(service.state(), ConnectionState::Connected);
        assert_eq!(transport.attempt_gaps_ms(), vec![500, 1000, 500, 1000]);
        service.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_index_continues_across_reconnects() {
        let transport = ScriptedTransport::new(vec![
            Script::Close(vec![velocity(1000), velocity(2000)]),
            Script::Fail(vec![velocity(3000)]),
            Script::Close(vec![velocity(4000)]),
        ]);
        let service = start(transport.clone());
        let mut events = service.subscribe();

        let mut indices = Vec::new();
        for _ in 0..4 {
            indices.push(events.recv().await.unwrap().index);
        }
        assert_eq!(indices, vec![1, 2, 3, 4]);

        let session = service.session().read().await;
        assert_eq!(session.sample_index(), 4);
        assert_eq!(
            session.buffer(Channel::Velocity).suffix(4),
            vec![1.0, 2.0, 3.0, 4.0]
        );
        drop(session);
        service.stop().await;
    }

    #[tokio::test]
    async fn test_malformed_messages_are_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let service = start(ScriptedTransport::new(vec![Script::Live(rx)]));
        let mut events = service.subscribe();
        wait_for_state(&service, ConnectionState::Connected).await;

        tx.send("{not json".to_string()).unwrap();
        tx.send("42".to_string()).unwrap();
        tx.send(velocity(1234)).unwrap();

        let accepted = events.recv().await.unwrap();
        assert_eq!(accepted.index, 1);
        assert_eq!(accepted.sample.velocity, 1.234);
        assert_eq!(service.state(), ConnectionState::Connected);
        service.stop().await;
    }

    #[tokio::test]
    async fn test_paused_messages_are_discarded() {
        let (tx, rx) = mpsc::unbounded_channel();
        let service = start(ScriptedTransport::new(vec![Script::Live(rx)]));
        let mut events = service.subscribe();
        wait_for_state(&service, ConnectionState::Connected).await;

        service.pause();
        assert!(service.is_paused());
        tx.send(velocity(9000)).unwrap();
        tx.send(velocity(9000)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        service.resume();
        tx.send(velocity(500)).unwrap();

        let accepted = events.recv().await.unwrap();
        assert_eq!(accepted.index, 1);
        assert_eq!(accepted.sample.velocity, 0.5);
        let session = service.session().read().await;
        assert_eq!(session.sample_index(), 1);
        assert_eq!(session.buffer(Channel::Velocity).suffix(2), vec![0.0, 0.5]);
        drop(session);
        service.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent_and_closes_connection() {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = ScriptedTransport::new(vec![Script::Live(rx)]);
        let service = start(transport.clone());
        wait_for_state(&service, ConnectionState::Connected).await;

        service.stop().await;
        service.stop().await;
        assert_eq!(service.state(), ConnectionState::Stopped);

        // the stream was dropped with the connection
        assert!(tx.send(velocity(1000)).is_err());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.attempt_count(), 1);
        assert_eq!(transport.close_count(), 1);
        assert_eq!(service.session().read().await.sample_index(), 0);
        service.pause();
        service.resume();
        assert_eq!(service.state(), ConnectionState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_reconnect() {
        let transport = ScriptedTransport::new(vec![Script::Refuse]);
        let service = start(transport.clone());
        wait_for_state(&service, ConnectionState::Error).await;

        service.stop().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.attempt_count(), 1);
        assert_eq!(transport.close_count(), 0);
        assert_eq!(service.state(), ConnectionState::Stopped);
    }

    #[tokio::test]
    async fn test_peer_close_reports_closed() {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = ScriptedTransport::new(vec![Script::Live(rx)]);
        let service = start(transport.clone());
        wait_for_state(&service, ConnectionState::Connected).await;

        drop(tx);
        wait_for_state(&service, ConnectionState::Closed).await;
        service.stop().await;
        assert_eq!(service.state(), ConnectionState::Stopped);
        // the peer already hung up, nothing left to close
        assert_eq!(transport.close_count(), 0);
    }
}
