//! Client configuration and endpoint normalization.

use std::time::Duration;

use roomwire_core::SessionConfig;
use url::Url;

use crate::error::TransportError;

/// Default interval between session ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Default time allowed for the WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Path used when the server URL has none.
pub const DEFAULT_ENDPOINT_PATH: &str = "/socket.io/";

/// Runtime configuration for [`crate::ChatClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server URL as supplied (`http`, `https`, `ws` or `wss`).
    pub url: String,
    /// Room, identity and history settings.
    pub session: SessionConfig,
    /// How often timers are evaluated. Bounds keepalive and reconnect
    /// precision.
    pub tick_interval: Duration,
    /// Time allowed for a single connection attempt.
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Configuration with default timing.
    pub fn new(url: impl Into<String>, session: SessionConfig) -> Self {
        Self {
            url: url.into(),
            session,
            tick_interval: DEFAULT_TICK_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Override the tick interval.
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Override the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// WebSocket endpoint for [`ClientConfig::url`].
    pub fn endpoint(&self) -> Result<Url, TransportError> {
        endpoint_url(&self.url)
    }
}

/// Turn a server URL into the WebSocket endpoint the client dials.
///
/// - `http` becomes `ws` and `https` becomes `wss`
/// - an empty path becomes [`DEFAULT_ENDPOINT_PATH`]
/// - `EIO=4` and `transport=websocket` are appended unless already present
///
/// # Errors
///
/// - `TransportError::InvalidUrl` if the URL does not parse or uses another
///   scheme
pub fn endpoint_url(raw: &str) -> Result<Url, TransportError> {
    let mut url = Url::parse(raw).map_err(|e| TransportError::InvalidUrl(format!("{raw}: {e}")))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(TransportError::InvalidUrl(format!("unsupported scheme {other}"))),
    };
    url.set_scheme(scheme)
        .map_err(|()| TransportError::InvalidUrl(format!("cannot switch {raw} to {scheme}")))?;

    if url.path().is_empty() || url.path() == "/" {
        url.set_path(DEFAULT_ENDPOINT_PATH);
    }

    let has_eio = url.query_pairs().any(|(key, _)| key == "EIO");
    let has_transport = url.query_pairs().any(|(key, _)| key == "transport");
    {
        let mut query = url.query_pairs_mut();
        if !has_eio {
            query.append_pair("EIO", "4");
        }
        if !has_transport {
            query.append_pair("transport", "websocket");
        }
    }

    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn https_becomes_wss_with_default_path() {
        let url = endpoint_url("https://chat.example").unwrap();
        assert_eq!(url.as_str(), "wss://chat.example/socket.io/?EIO=4&transport=websocket");
    }

    #[test]
    fn http_keeps_port_and_path() {
        let url = endpoint_url("http://localhost:3000/rooms/io/").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:3000/rooms/io/?EIO=4&transport=websocket");
    }

    #[test]
    fn existing_query_is_preserved() {
        let url = endpoint_url("wss://chat.example/socket.io/?EIO=3&token=abc").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://chat.example/socket.io/?EIO=3&token=abc&transport=websocket"
        );
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(matches!(endpoint_url("ftp://chat.example"), Err(TransportError::InvalidUrl(_))));
        assert!(matches!(endpoint_url("not a url"), Err(TransportError::InvalidUrl(_))));
    }
}
