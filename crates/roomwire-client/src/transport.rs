//! WebSocket transport for the client.
//!
//! Provides [`Connection`], a pair of channels bridged to a socket by a
//! background task. This is a thin layer that only moves text frames; all
//! protocol logic stays in the Sans-IO [`roomwire_core::Session`].
//!
//! The [`Connector`] trait is the seam between the runtime and the network.
//! [`WebSocketConnector`] dials real servers; tests substitute an in-memory
//! connector built on [`Connection::new`].

use std::future::Future;

use futures_util::{SinkExt, StreamExt};
use tokio::{
    net::TcpStream,
    sync::mpsc::{self, error::TrySendError},
    task::AbortHandle,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Message, protocol::CloseFrame},
};
use url::Url;

use crate::error::TransportError;

/// Frames buffered in each direction before the producer has to wait.
pub const CHANNEL_CAPACITY: usize = 32;

/// Something that happened on the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// One text frame.
    Text(String),
    /// The socket is gone. No further events follow.
    Closed {
        /// Close reason.
        reason: String,
    },
}

/// Handle to an open socket.
///
/// Frames are sent and received through bounded channels; a background task
/// owns the socket itself. The socket reader waits while `from_server` is
/// full, so a flooding server is throttled at the socket. Dropping the handle
/// stops that task.
pub struct Connection {
    /// Send text frames to the server.
    pub to_server: mpsc::Sender<String>,
    /// Receive socket events from the server.
    pub from_server: mpsc::Receiver<SocketEvent>,
    /// Abort handle to stop the socket task.
    abort_handle: Option<AbortHandle>,
}

impl Connection {
    /// Connection over caller-provided channels with no socket task.
    pub fn new(to_server: mpsc::Sender<String>, from_server: mpsc::Receiver<SocketEvent>) -> Self {
        Self { to_server, from_server, abort_handle: None }
    }

    /// Queue a text frame without waiting.
    ///
    /// # Errors
    ///
    /// - `TransportError::QueueFull` if the socket is not keeping up
    /// - `TransportError::Closed` if the socket task has ended
    pub fn send(&self, text: String) -> Result<(), TransportError> {
        self.to_server.try_send(text).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::QueueFull(CHANNEL_CAPACITY),
            TrySendError::Closed(_) => TransportError::Closed("socket task ended".to_string()),
        })
    }

    /// Stop the connection.
    pub fn stop(&self) {
        if let Some(handle) = &self.abort_handle {
            handle.abort();
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Opens connections for the runtime.
pub trait Connector: Clone + Send + Sync + 'static {
    /// Open a connection to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    fn connect(&self, url: Url) -> impl Future<Output = Result<Connection, TransportError>> + Send;
}

/// Connector for real WebSocket servers (`ws` and `wss`).
#[derive(Clone, Debug, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    async fn connect(&self, url: Url) -> Result<Connection, TransportError> {
        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::Connection(format!("{url}: {e}")))?;

        tracing::debug!("WebSocket open to {}", url);

        let (to_server_tx, to_server_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        let (from_server_tx, from_server_rx) = mpsc::channel::<SocketEvent>(CHANNEL_CAPACITY);

        let handle = tokio::spawn(run_socket(stream, to_server_rx, from_server_tx));

        Ok(Connection {
            to_server: to_server_tx,
            from_server: from_server_rx,
            abort_handle: Some(handle.abort_handle()),
        })
    }
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Bridge between the channels and the socket until either side goes away.
async fn run_socket(
    stream: Socket,
    mut to_server: mpsc::Receiver<String>,
    from_server: mpsc::Sender<SocketEvent>,
) {
    let (mut sink, mut source) = stream.split();

    let reason = loop {
        tokio::select! {
            outgoing = to_server.recv() => match outgoing {
                Some(text) => {
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        break format!("write failed: {e}");
                    }
                },
                None => {
                    // Runtime dropped the connection
                    let _ = sink.close().await;
                    return;
                },
            },
            incoming = source.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    // Stops reading until the runtime catches up
                    if from_server.send(SocketEvent::Text(text)).await.is_err() {
                        let _ = sink.close().await;
                        return;
                    }
                },
                Some(Ok(Message::Close(frame))) => break close_reason(frame.as_ref()),
                Some(Ok(Message::Binary(bytes))) => {
                    tracing::debug!("Ignoring {} byte binary frame", bytes.len());
                },
                Some(Ok(_)) => {},
                Some(Err(e)) => break format!("read failed: {e}"),
                None => break "stream ended".to_string(),
            },
        }
    };

    tracing::debug!("Socket closed: {}", reason);
    let _ = from_server.send(SocketEvent::Closed { reason }).await;
}

fn close_reason(frame: Option<&CloseFrame<'_>>) -> String {
    match frame {
        Some(frame) if !frame.reason.is_empty() => {
            format!("closed by server ({}): {}", u16::from(frame.code), frame.reason)
        },
        Some(frame) => format!("closed by server ({})", u16::from(frame.code)),
        None => "closed by server".to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_connection_round_trip() {
        let (to_server, mut server_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (server_tx, from_server) = mpsc::channel(CHANNEL_CAPACITY);
        let mut connection = Connection::new(to_server, from_server);

        connection.send("2".to_string()).unwrap();
        assert_eq!(server_rx.try_recv().unwrap(), "2");

        server_tx.try_send(SocketEvent::Text("3".into())).unwrap();
        assert_eq!(connection.from_server.try_recv().unwrap(), SocketEvent::Text("3".into()));
    }

    #[test]
    fn send_reports_full_queue_without_blocking() {
        let (to_server, mut server_rx) = mpsc::channel(2);
        let (_server_tx, from_server) = mpsc::channel(2);
        let connection = Connection::new(to_server, from_server);

        connection.send("a".into()).unwrap();
        connection.send("b".into()).unwrap();
        assert!(matches!(connection.send("c".into()), Err(TransportError::QueueFull(_))));

        // Draining frees room again
        assert_eq!(server_rx.try_recv().unwrap(), "a");
        connection.send("c".into()).unwrap();
    }

    #[test]
    fn send_fails_once_peer_is_gone() {
        let (to_server, server_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (_server_tx, from_server) = mpsc::channel(CHANNEL_CAPACITY);
        let connection = Connection::new(to_server, from_server);
        drop(server_rx);

        assert!(matches!(connection.send("2".into()), Err(TransportError::Closed(_))));
    }
}
