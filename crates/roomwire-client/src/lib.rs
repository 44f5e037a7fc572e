//! Client
//!
//! Runs a [`roomwire_core::Session`] over a WebSocket and exposes it as a
//! [`ChatClient`] handle.
//!
//! # Architecture
//!
//! ```text
//! ChatClient ──commands──> Runtime task ──events──> Session (Sans-IO)
//!      ↑                      │    ↑                    │
//!      └──────notices─────────┘    └──── actions ───────┘
//!                                 │
//!                            Connection (socket task)
//! ```
//!
//! The runtime is a single-writer actor: it alone owns the session, the
//! connection and all timers, so no state is shared between tasks.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
mod runtime;
pub mod system_env;
pub mod transport;

pub use client::ChatClient;
pub use config::{ClientConfig, endpoint_url};
pub use error::{ClientError, TransportError};
pub use roomwire_core::{ChatMessage, ConnectionState, SessionConfig, SessionNotice};
pub use system_env::SystemEnv;
pub use transport::{Connection, Connector, SocketEvent, WebSocketConnector};
