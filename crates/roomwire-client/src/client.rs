//! Public chat client facade.
//!
//! [`ChatClient`] is a handle to a [`crate::runtime`] task. Intents
//! (`connect`, `disconnect`, `send_message`) are queued and return
//! immediately; their outcome arrives as a [`SessionNotice`]. Queries round
//! trip through the runtime and return copies, never live state.

use roomwire_core::{ChatMessage, ConnectionState, Environment, Session, SessionNotice};
use tokio::{
    sync::{
        broadcast,
        mpsc::{self, error::TrySendError},
        oneshot,
    },
    task::JoinHandle,
};

use crate::{
    config::ClientConfig,
    error::ClientError,
    runtime::{Command, Runtime},
    system_env::SystemEnv,
    transport::{Connector, WebSocketConnector},
};

/// Notices buffered per subscriber before the slowest one starts lagging.
pub const NOTICE_CAPACITY: usize = 256;

/// Commands queued for the runtime before intents report
/// [`ClientError::Busy`].
pub const COMMAND_CAPACITY: usize = 64;

/// Handle to one chat session.
///
/// Dropping the handle stops the runtime and closes the socket.
pub struct ChatClient {
    commands: mpsc::Sender<Command>,
    notices: broadcast::Sender<SessionNotice>,
    task: JoinHandle<()>,
}

impl ChatClient {
    /// Start a client that dials real WebSocket servers.
    ///
    /// Must be called inside a Tokio runtime. Does not connect; call
    /// [`ChatClient::connect`].
    ///
    /// # Errors
    ///
    /// - `ClientError::Transport` if the configured URL is not a valid
    ///   endpoint
    pub fn start(config: ClientConfig) -> Result<Self, ClientError> {
        Self::with_connector(config, WebSocketConnector, SystemEnv::new())
    }

    /// Start a client over a custom connector and environment.
    ///
    /// # Errors
    ///
    /// - `ClientError::Transport` if the configured URL is not a valid
    ///   endpoint
    pub fn with_connector<C, E>(
        config: ClientConfig,
        connector: C,
        env: E,
    ) -> Result<Self, ClientError>
    where
        C: Connector,
        E: Environment,
    {
        let endpoint = config.endpoint()?;
        let (commands, commands_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        let session = Session::new(env.clone(), config.session);
        let runtime = Runtime::new(
            session,
            env,
            connector,
            endpoint,
            config.connect_timeout,
            config.tick_interval,
            commands_rx,
            notices.clone(),
        );
        let task = tokio::spawn(runtime.run());

        Ok(Self { commands, notices, task })
    }

    /// Subscribe to lifecycle notices.
    ///
    /// Only notices emitted after this call are received.
    pub fn notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    /// Start connecting. No-op if already connecting or connected.
    ///
    /// # Errors
    ///
    /// - `ClientError::Busy` if the command queue is full
    /// - `ClientError::Closed` if the runtime has stopped
    pub fn connect(&self) -> Result<(), ClientError> {
        self.command(Command::Connect)
    }

    /// Close the session without reconnecting. Safe in any state.
    pub fn disconnect(&self) -> Result<(), ClientError> {
        self.command(Command::Disconnect)
    }

    /// Post a chat message.
    ///
    /// Outside the active state nothing is sent and a
    /// [`SessionNotice::SendRejected`] follows. Delivery is not confirmed; a
    /// server-side rejection arrives as [`SessionNotice::ServerError`].
    pub fn send_message(&self, text: impl Into<String>) -> Result<(), ClientError> {
        self.command(Command::Send(text.into()))
    }

    /// The `limit` most recent messages, or all of them, oldest first.
    pub async fn get_messages(&self, limit: Option<usize>) -> Result<Vec<ChatMessage>, ClientError> {
        self.query(|reply| Command::Messages { limit, reply }).await
    }

    /// Most recent buffered message.
    pub async fn get_latest_message(&self) -> Result<Option<ChatMessage>, ClientError> {
        self.query(Command::Latest).await
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> Result<ConnectionState, ClientError> {
        self.query(Command::State).await
    }

    /// True if the session is active.
    pub async fn is_active(&self) -> Result<bool, ClientError> {
        Ok(self.state().await? == ConnectionState::Active)
    }

    /// Remove and return every buffered message, oldest first.
    pub async fn drain_messages(&self) -> Result<Vec<ChatMessage>, ClientError> {
        self.query(Command::Drain).await
    }

    /// Stop the runtime and wait for it to finish.
    pub async fn shutdown(mut self) {
        let _ = self.commands.send(Command::Shutdown).await;
        if let Err(e) = (&mut self.task).await {
            tracing::warn!("Runtime task ended abnormally: {}", e);
        }
    }

    fn command(&self, command: Command) -> Result<(), ClientError> {
        self.commands.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => ClientError::Busy,
            TrySendError::Closed(_) => ClientError::Closed,
        })
    }

    async fn query<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ClientError> {
        let (reply, response) = oneshot::channel();
        self.commands.send(command(reply)).await.map_err(|_| ClientError::Closed)?;
        response.await.map_err(|_| ClientError::Closed)
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        // A full queue still stops: the runtime exits once the sender drops
        let _ = self.commands.try_send(Command::Shutdown);
    }
}
