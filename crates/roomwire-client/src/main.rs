//! roomwire command-line client.
//!
//! Joins a room, logs everything that happens in it and posts each line read
//! from stdin as a chat message.
//!
//! # Usage
//!
//! ```bash
//! roomwire --url https://chat.example --room lobby --username ada
//!
//! # Verbose protocol logging
//! RUST_LOG=roomwire_core=debug roomwire --url http://localhost:3000 --room lobby
//! ```

use clap::Parser;
use roomwire_client::{ChatClient, ClientConfig, ClientError, SessionConfig, SessionNotice};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::{self, error::RecvError},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// roomwire chat client
#[derive(Parser, Debug)]
#[command(name = "roomwire")]
#[command(about = "Join a chat room and relay stdin as messages")]
#[command(version)]
struct Args {
    /// Server URL (http, https, ws or wss)
    #[arg(short, long)]
    url: String,

    /// Room to join
    #[arg(short, long)]
    room: String,

    /// Display name
    #[arg(long)]
    username: Option<String>,

    /// Number of messages kept in history
    #[arg(long, default_value = "100")]
    history: usize,

    /// Origin reported in the handshake
    #[arg(long)]
    origin: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let mut session = SessionConfig::new(args.room)?.with_history_capacity(args.history)?;
    if let Some(username) = args.username {
        session = session.with_username(username);
    }
    if let Some(origin) = args.origin {
        session = session.with_origin(origin);
    }

    let client = ChatClient::start(ClientConfig::new(args.url, session))?;
    let notices = tokio::spawn(log_notices(client.notices()));
    client.connect()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {},
                Some(line) => match client.send_message(line) {
                    Err(ClientError::Busy) => tracing::warn!("Client busy, line not sent"),
                    result => result?,
                },
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tracing::info!("Shutting down");
    client.disconnect()?;
    client.shutdown().await;
    notices.abort();

    Ok(())
}

async fn log_notices(mut notices: broadcast::Receiver<SessionNotice>) {
    loop {
        match notices.recv().await {
            Ok(notice) => log_notice(&notice),
            Err(RecvError::Lagged(skipped)) => tracing::warn!("Missed {} notices", skipped),
            Err(RecvError::Closed) => break,
        }
    }
}

fn log_notice(notice: &SessionNotice) {
    match notice {
        SessionNotice::Connected => tracing::info!("Connected"),
        SessionNotice::Disconnected { reason } => tracing::warn!("Disconnected: {}", reason),
        SessionNotice::Reconnecting { attempt, delay } => {
            tracing::warn!("Reconnect attempt {} in {:?}", attempt, delay);
        },
        SessionNotice::GaveUp { attempts } => {
            tracing::error!("Gave up after {} reconnect attempts", attempts);
        },
        SessionNotice::MessageReceived(message) => {
            tracing::info!("<{}> {}", message.username, message.message);
        },
        SessionNotice::HistoryReady(messages) => {
            for message in messages {
                tracing::info!("[history] <{}> {}", message.username, message.message);
            }
            tracing::info!("Joined with {} messages of history", messages.len());
        },
        SessionNotice::UserLeft(info) => tracing::info!("User left: {}", info),
        SessionNotice::ServerError { message } => tracing::error!("Server error: {}", message),
        SessionNotice::SendRejected { state } => {
            tracing::warn!("Not sent, session is {:?}", state);
        },
    }
}
