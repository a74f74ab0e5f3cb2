use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;

mod classifier;
mod error;
mod message;
mod registry;
mod scheduler;
mod transport;

pub use classifier::{Classified, Classifier, Rule, PLAYER_INFO_MARKER};
pub use error::SessionError;
pub use message::{
    ConnectionState, ConsoleMessage, MessageClass, PlayerEvent, PlayerInfo, SessionEvent,
};
pub use registry::PlayerRegistry;
pub use scheduler::CommandScheduler;
pub use transport::{start_writer, LineReader};

/// Create the single-consumer notification channel between the session
/// core and the presentation layer.
pub fn session_channel(buffer: usize) -> (EventSender, mpsc::Receiver<SessionEvent>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender(tx), rx)
}

/// Sending side of the session event channel.
///
/// Publishing tolerates a dropped consumer; the core never wedges because
/// the presentation side went away.
#[derive(Debug, Clone)]
pub struct EventSender(mpsc::Sender<SessionEvent>);

impl EventSender {
    pub async fn publish(&self, event: SessionEvent) {
        if self.0.send(event).await.is_err() {
            debug!("session event dropped, consumer is gone");
        }
    }
}

/// Per-connection session state, guarded as one unit
#[derive(Debug, Default)]
struct Session {
    state: SessionState,
    address: String,
    /// Bumped on every connect and disconnect so a stale read loop cannot
    /// tear down a newer connection
    generation: u64,
    outbound: Option<mpsc::Sender<String>>,
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl From<SessionState> for ConnectionState {
    fn from(state: SessionState) -> Self {
        match state {
            SessionState::Disconnected => ConnectionState::Disconnected,
            SessionState::Connecting => ConnectionState::Connecting,
            SessionState::Connected => ConnectionState::Connected,
            SessionState::Disconnecting => ConnectionState::Disconnecting,
        }
    }
}

/// Owns the console socket, the background read loop, the outbound writer
/// and the connection state machine.
///
/// Cheap to clone; clones share the same session.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    session: Arc<Mutex<Session>>,
    registry: Arc<PlayerRegistry>,
    classifier: Arc<Classifier>,
    scheduler: CommandScheduler,
    events: EventSender,
    connect_timeout: Duration,
    outbound_buffer: usize,
}

impl ConnectionManager {
    /// Create a manager publishing to the given event channel
    pub fn new(connect_timeout: Duration, events: EventSender) -> Self {
        Self::with_classifier(connect_timeout, events, Classifier::default())
    }

    /// Create a manager with a dialect-specific classification table
    pub fn with_classifier(
        connect_timeout: Duration,
        events: EventSender,
        classifier: Classifier,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::default())),
            registry: Arc::new(PlayerRegistry::new()),
            classifier: Arc::new(classifier),
            scheduler: CommandScheduler::new(),
            events,
            connect_timeout,
            outbound_buffer: 64,
        }
    }

    /// Current connection state
    pub async fn state(&self) -> ConnectionState {
        self.session.lock().await.state.into()
    }

    /// Snapshot of the current player list
    pub fn players(&self) -> Vec<PlayerInfo> {
        self.registry.players()
    }

    /// Status line derived purely from the current state
    pub async fn title(&self) -> String {
        let session = self.session.lock().await;
        match session.state {
            SessionState::Disconnected => "Telnet Console - Disconnected".to_string(),
            SessionState::Connecting => {
                format!("Telnet Console - Connecting to {}...", session.address)
            }
            SessionState::Connected => {
                format!("Telnet Console - Connected to {}", session.address)
            }
            SessionState::Disconnecting => "Telnet Console - Disconnecting...".to_string(),
        }
    }

    /// Open a connection to `address` (`host:port`) and start the read loop.
    ///
    /// Fails with [`SessionError::AlreadyConnected`] unless currently
    /// disconnected; connection failures report their cause and leave the
    /// manager disconnected, ready for a fresh attempt.
    pub async fn connect(&self, address: &str) -> Result<(), SessionError> {
        let generation = {
            let mut session = self.session.lock().await;
            if session.state != SessionState::Disconnected {
                return Err(SessionError::AlreadyConnected);
            }
            session.state = SessionState::Connecting;
            session.address = address.to_string();
            session.generation += 1;
            session.generation
        };
        self.events
            .publish(SessionEvent::State(ConnectionState::Connecting))
            .await;
        info!("Connecting to {}", address);

        let stream = match timeout(self.connect_timeout, TcpStream::connect(address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return self
                    .abort_connect(generation, SessionError::Connection(e.to_string()))
                    .await;
            }
            Err(_) => {
                return self
                    .abort_connect(
                        generation,
                        SessionError::Connection(format!(
                            "timed out after {:?}",
                            self.connect_timeout
                        )),
                    )
                    .await;
            }
        };

        let (read_half, write_half) = stream.into_split();
        let (outbound, writer) = start_writer(write_half, self.outbound_buffer);
        let reader = tokio::spawn({
            let manager = self.clone();
            let mut lines = LineReader::new(read_half);
            async move {
                loop {
                    match lines.next_line().await {
                        Ok(Some(line)) => manager.handle_line(&line).await,
                        Ok(None) => {
                            manager
                                .finish(generation, Some("Connection closed by server".to_string()))
                                .await;
                            break;
                        }
                        Err(e) => {
                            let reason = SessionError::Read(e.to_string()).to_string();
                            manager.finish(generation, Some(reason)).await;
                            break;
                        }
                    }
                }
            }
        });

        {
            let mut session = self.session.lock().await;
            // disconnect() may have raced us while the dial was in flight
            if session.generation != generation || session.state != SessionState::Connecting {
                reader.abort();
                writer.abort();
                return Err(SessionError::Connection("connection aborted".to_string()));
            }
            session.state = SessionState::Connected;
            session.outbound = Some(outbound);
            session.reader = Some(reader);
            session.writer = Some(writer);
        }
        self.events
            .publish(SessionEvent::State(ConnectionState::Connected))
            .await;
        info!("Connected to {}", address);
        Ok(())
    }

    async fn abort_connect(
        &self,
        generation: u64,
        error: SessionError,
    ) -> Result<(), SessionError> {
        warn!("Connection attempt failed: {}", error);
        {
            let mut session = self.session.lock().await;
            if session.generation == generation && session.state == SessionState::Connecting {
                session.state = SessionState::Disconnected;
            }
        }
        self.events
            .publish(SessionEvent::Console(ConsoleMessage::error(
                error.to_string(),
            )))
            .await;
        self.events
            .publish(SessionEvent::State(ConnectionState::Disconnected))
            .await;
        Err(error)
    }

    /// Close the connection and stop the read loop. Idempotent: calling
    /// while disconnected (or while another teardown is in flight) does
    /// nothing and publishes nothing.
    pub async fn disconnect(&self) {
        let (reader, writer) = {
            let mut session = self.session.lock().await;
            if matches!(
                session.state,
                SessionState::Disconnected | SessionState::Disconnecting
            ) {
                return;
            }
            session.state = SessionState::Disconnecting;
            session.generation += 1;
            session.outbound = None;
            (session.reader.take(), session.writer.take())
        };
        self.events
            .publish(SessionEvent::State(ConnectionState::Disconnecting))
            .await;

        // Aborting the reader unblocks any read pending on the socket
        if let Some(reader) = reader {
            reader.abort();
        }
        if let Some(writer) = writer {
            writer.abort();
        }

        self.teardown().await;
        info!("Disconnected");
    }

    /// Read-loop initiated teardown; runs at most once per connection.
    async fn finish(&self, generation: u64, reason: Option<String>) {
        let writer = {
            let mut session = self.session.lock().await;
            if session.generation != generation || session.state != SessionState::Connected {
                // A newer connection owns the state, or disconnect() won
                return;
            }
            session.state = SessionState::Disconnecting;
            session.outbound = None;
            session.reader.take();
            session.writer.take()
        };
        self.events
            .publish(SessionEvent::State(ConnectionState::Disconnecting))
            .await;

        if let Some(reason) = reason {
            warn!("{}", reason);
            self.events
                .publish(SessionEvent::Console(ConsoleMessage::error(reason)))
                .await;
        }
        if let Some(writer) = writer {
            writer.abort();
        }

        self.teardown().await;
    }

    async fn teardown(&self) {
        self.scheduler.cancel_all().await;
        self.registry.clear();
        self.events
            .publish(SessionEvent::PlayerList(Vec::new()))
            .await;
        {
            let mut session = self.session.lock().await;
            session.state = SessionState::Disconnected;
        }
        self.events
            .publish(SessionEvent::State(ConnectionState::Disconnected))
            .await;
    }

    /// Classify one inbound line, apply it to the player list and publish
    /// the results.
    async fn handle_line(&self, line: &str) {
        if line.is_empty() {
            return;
        }
        let Classified { message, event } = self.classifier.classify(line);
        if self.registry.apply(&event) {
            self.events
                .publish(SessionEvent::PlayerList(self.registry.players()))
                .await;
        }
        self.events.publish(SessionEvent::Console(message)).await;
    }

    /// Send a command line immediately.
    ///
    /// The line terminator is appended here; the single writer task keeps
    /// concurrent senders from interleaving partial lines.
    pub async fn send_command(&self, text: &str) -> Result<(), SessionError> {
        let outbound = {
            let session = self.session.lock().await;
            if session.state != SessionState::Connected {
                return Err(SessionError::NotConnected);
            }
            session.outbound.clone().ok_or(SessionError::NotConnected)?
        };
        outbound
            .send(format!("{}\n", text))
            .await
            .map_err(|_| SessionError::ChannelClosed)
    }

    /// Schedule a command to be sent after `delay`, without blocking.
    ///
    /// With `coalesce` set, a duplicate of an already-pending command is
    /// dropped instead of double-sent. Returns whether a timer was armed.
    pub async fn send_delayed_command(
        &self,
        text: &str,
        coalesce: bool,
        delay: Duration,
    ) -> Result<bool, SessionError> {
        let outbound = {
            let session = self.session.lock().await;
            if session.state != SessionState::Connected {
                return Err(SessionError::NotConnected);
            }
            session.outbound.clone().ok_or(SessionError::NotConnected)?
        };
        Ok(self.scheduler.schedule(text, coalesce, delay, outbound).await)
    }
}
