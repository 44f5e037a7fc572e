//! Protocol
//!
//! Text framing for the roomwire chat transport. Every frame is a short run of
//! decimal digits identifying the frame kind, optionally followed by a JSON
//! payload:
//!
//! ```text
//! 0{"sid":"..","pingInterval":25000}     connect info (server)
//! 40{"origin":"..","timestamp":..}       handshake (both directions)
//! 41                                     server disconnect
//! 42["newMessage",{..}]                  event
//! 421["sendMessage",{..}]                correlated event (ack id 1)
//! 431[{"error":null}]                    correlated acknowledgment
//! 2 / 3                                  ping / pong
//! ```
//!
//! # Components
//!
//! - [`Frame`]: Decoded frame, stateless `decode`/`encode`
//! - [`AckId`]: Single-digit correlation identifier
//! - [`payloads`]: Typed request bodies, server events and [`ChatMessage`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod frame;
pub mod payloads;

pub use errors::{ProtocolError, Result};
pub use frame::{AckId, Frame};
pub use payloads::{ChatMessage, ClientRequest, ConnectInfo, Handshake, ServerEvent};
