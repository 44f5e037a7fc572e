//! Core
//!
//! Sans-IO session logic for the roomwire chat protocol: handshake, room join,
//! history fetch, keepalive, request correlation and reconnect backoff.
//!
//! # Architecture
//!
//! [`Session`] is a pure state machine. The caller feeds it
//! [`SessionEvent`]s (frames from the socket, transport signals, time ticks,
//! application intents) and executes the [`SessionAction`]s it returns (send a
//! frame, open or close the transport, deliver a [`SessionNotice`]). Time is
//! read through [`Environment`] so tests run on a virtual clock.
//!
//! # Components
//!
//! - [`Session`]: Connection lifecycle and frame routing
//! - [`Correlator`]: Cyclic ack ids with TTL expiry
//! - [`HistoryBuffer`]: Bounded FIFO of received messages
//! - [`Keepalive`]: Ping cadence from the server's connect info
//! - [`ReconnectPolicy`]: Capped exponential backoff

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod correlator;
pub mod env;
pub mod error;
pub mod event;
pub mod history;
pub mod keepalive;
pub mod reconnect;
pub mod session;

pub use config::SessionConfig;
pub use correlator::{Correlator, PendingAck, RequestKind};
pub use env::Environment;
pub use error::ConfigError;
pub use event::{SessionAction, SessionEvent, SessionNotice};
pub use history::HistoryBuffer;
pub use keepalive::Keepalive;
pub use reconnect::ReconnectPolicy;
pub use roomwire_proto::{ChatMessage, Frame};
pub use session::{ConnectionState, Session};
