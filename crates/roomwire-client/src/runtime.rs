//! Single-writer runtime for one chat session.
//!
//! The Runtime is the only owner of the [`Session`], the live [`Connection`]
//! and every timer. It runs as one Tokio task and serializes four inputs:
//!
//! - commands from [`crate::ChatClient`] handles
//! - socket events from the current connection
//! - results of connection attempts running in spawned tasks
//! - ticks from an interval timer
//!
//! Each input becomes a [`SessionEvent`]; the returned [`SessionAction`]s are
//! executed before the next input is read, so frames are processed strictly
//! in arrival order.
//!
//! Connection attempts are tagged with a generation number. Closing the
//! transport or starting a new attempt bumps the generation, and any result
//! carrying an older one is discarded.

use std::time::Duration;

use roomwire_core::{
    ChatMessage, ConnectionState, Environment, Session, SessionAction, SessionEvent,
    SessionNotice,
};
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    time::MissedTickBehavior,
};
use url::Url;

use crate::{
    error::TransportError,
    transport::{Connection, Connector, SocketEvent},
};

/// Requests sent from client handles to the runtime.
#[derive(Debug)]
pub(crate) enum Command {
    Connect,
    Disconnect,
    Send(String),
    Messages { limit: Option<usize>, reply: oneshot::Sender<Vec<ChatMessage>> },
    Latest(oneshot::Sender<Option<ChatMessage>>),
    State(oneshot::Sender<ConnectionState>),
    Drain(oneshot::Sender<Vec<ChatMessage>>),
    Shutdown,
}

type AttemptResult = (u64, Result<Connection, TransportError>);

/// In-flight connection attempts whose results can be parked unread.
const ATTEMPT_CAPACITY: usize = 4;

/// Event loop that drives a [`Session`] over a [`Connector`].
pub(crate) struct Runtime<C, E>
where
    C: Connector,
    E: Environment,
{
    session: Session<E>,
    env: E,
    connector: C,
    endpoint: Url,
    connect_timeout: Duration,
    tick_interval: Duration,
    commands: mpsc::Receiver<Command>,
    notices: broadcast::Sender<SessionNotice>,
    connection: Option<Connection>,
    generation: u64,
    attempts_tx: mpsc::Sender<AttemptResult>,
    attempts_rx: mpsc::Receiver<AttemptResult>,
}

impl<C, E> Runtime<C, E>
where
    C: Connector,
    E: Environment,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        session: Session<E>,
        env: E,
        connector: C,
        endpoint: Url,
        connect_timeout: Duration,
        tick_interval: Duration,
        commands: mpsc::Receiver<Command>,
        notices: broadcast::Sender<SessionNotice>,
    ) -> Self {
        let (attempts_tx, attempts_rx) = mpsc::channel(ATTEMPT_CAPACITY);
        Self {
            session,
            env,
            connector,
            endpoint,
            connect_timeout,
            tick_interval,
            commands,
            notices,
            connection: None,
            generation: 0,
            attempts_tx,
            attempts_rx,
        }
    }

    /// Run until shutdown or until every client handle is dropped.
    pub(crate) async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.on_command(command),
                },
                Some((generation, result)) = self.attempts_rx.recv() => {
                    self.on_attempt(generation, result);
                },
                event = next_socket_event(self.connection.as_mut()) => self.on_socket(event),
                _ = ticker.tick() => {
                    let now = self.env.now();
                    self.dispatch(SessionEvent::Tick { now });
                },
            }
        }

        tracing::debug!("Runtime stopping");
        self.dispatch(SessionEvent::Disconnect);
        self.close_transport();
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Connect => self.dispatch(SessionEvent::Connect),
            Command::Disconnect => self.dispatch(SessionEvent::Disconnect),
            Command::Send(text) => self.dispatch(SessionEvent::SendMessage { text }),
            Command::Messages { limit, reply } => {
                let _ = reply.send(self.session.messages(limit));
            },
            Command::Latest(reply) => {
                let _ = reply.send(self.session.latest_message().cloned());
            },
            Command::State(reply) => {
                let _ = reply.send(self.session.state());
            },
            Command::Drain(reply) => {
                let _ = reply.send(self.session.drain_messages());
            },
            Command::Shutdown => {},
        }
    }

    fn on_attempt(&mut self, generation: u64, result: Result<Connection, TransportError>) {
        if generation != self.generation {
            tracing::debug!("Discarding stale connection attempt {}", generation);
            if let Ok(connection) = result {
                connection.stop();
            }
            return;
        }

        match result {
            Ok(connection) => {
                self.connection = Some(connection);
                self.dispatch(SessionEvent::TransportOpened);
            },
            Err(e) => self.dispatch(SessionEvent::TransportFailed { reason: e.to_string() }),
        }
    }

    fn on_socket(&mut self, event: SocketEvent) {
        match event {
            SocketEvent::Text(text) => self.dispatch(SessionEvent::FrameReceived(text)),
            SocketEvent::Closed { reason } => {
                self.connection = None;
                self.dispatch(SessionEvent::TransportClosed { reason });
            },
        }
    }

    fn dispatch(&mut self, event: SessionEvent<E::Instant>) {
        for action in self.session.handle(event) {
            self.execute(action);
        }
    }

    fn execute(&mut self, action: SessionAction) {
        match action {
            SessionAction::OpenTransport => self.open_transport(),
            SessionAction::CloseTransport => self.close_transport(),
            SessionAction::Send(frame) => {
                let Some(connection) = &self.connection else {
                    tracing::debug!("No transport for {} frame", frame.kind());
                    return;
                };
                match connection.send(frame.encode()) {
                    Ok(()) => {},
                    Err(e @ TransportError::QueueFull(_)) => {
                        tracing::warn!("Dropping {} frame: {}", frame.kind(), e);
                    },
                    Err(e) => tracing::debug!("Dropping {} frame: {}", frame.kind(), e),
                }
            },
            SessionAction::Notify(notice) => {
                // No subscribers is fine
                let _ = self.notices.send(notice);
            },
        }
    }

    fn open_transport(&mut self) {
        self.close_transport();

        let generation = self.generation;
        let connector = self.connector.clone();
        let endpoint = self.endpoint.clone();
        let timeout = self.connect_timeout;
        let results = self.attempts_tx.clone();

        tracing::info!("Connecting to {}", endpoint);
        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, connector.connect(endpoint)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(timeout)),
            };
            let _ = results.send((generation, result)).await;
        });
    }

    fn close_transport(&mut self) {
        self.generation += 1;
        if let Some(connection) = self.connection.take() {
            connection.stop();
        }
    }
}

/// Next event from the current connection, or never if there is none.
async fn next_socket_event(connection: Option<&mut Connection>) -> SocketEvent {
    let Some(connection) = connection else {
        return std::future::pending().await;
    };
    connection
        .from_server
        .recv()
        .await
        .unwrap_or_else(|| SocketEvent::Closed { reason: "connection lost".to_string() })
}
