//! Session configuration.

use crate::error::ConfigError;

/// Display name used when the caller supplies none.
pub const DEFAULT_USERNAME: &str = "Anonymous";

/// Default number of messages retained in the history buffer.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Origin sent in the handshake when the caller supplies none.
pub const DEFAULT_ORIGIN: &str = "roomwire";

/// Immutable per-client session settings.
///
/// # Invariants
///
/// - `room_id` is never empty
/// - `history_capacity >= 1`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    room_id: String,
    username: String,
    history_capacity: usize,
    origin: String,
}

impl SessionConfig {
    /// Configuration for `room_id` with default username, capacity and origin.
    ///
    /// # Errors
    ///
    /// - `ConfigError::EmptyRoomId` if `room_id` is blank
    pub fn new(room_id: impl Into<String>) -> Result<Self, ConfigError> {
        let room_id = room_id.into();
        if room_id.trim().is_empty() {
            return Err(ConfigError::EmptyRoomId);
        }

        Ok(Self {
            room_id,
            username: DEFAULT_USERNAME.to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            origin: DEFAULT_ORIGIN.to_string(),
        })
    }

    /// Set the display name. A blank name keeps the anonymous default.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        let username = username.into();
        if !username.trim().is_empty() {
            self.username = username;
        }
        self
    }

    /// Set the history capacity.
    ///
    /// # Errors
    ///
    /// - `ConfigError::ZeroHistoryCapacity` if `capacity == 0`
    pub fn with_history_capacity(mut self, capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroHistoryCapacity);
        }
        self.history_capacity = capacity;
        Ok(self)
    }

    /// Set the handshake origin.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Room to join.
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Display name sent with join and send requests.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Maximum number of retained messages; also the history fetch limit.
    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    /// Origin reported in the handshake.
    pub fn origin(&self) -> &str {
        &self.origin
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::new("lobby").unwrap();
        assert_eq!(config.room_id(), "lobby");
        assert_eq!(config.username(), DEFAULT_USERNAME);
        assert_eq!(config.history_capacity(), DEFAULT_HISTORY_CAPACITY);
        assert_eq!(config.origin(), DEFAULT_ORIGIN);
    }

    #[test]
    fn empty_room_is_rejected() {
        assert_eq!(SessionConfig::new(""), Err(ConfigError::EmptyRoomId));
        assert_eq!(SessionConfig::new("   "), Err(ConfigError::EmptyRoomId));
    }

    #[test]
    fn blank_username_keeps_default() {
        let config = SessionConfig::new("lobby").unwrap().with_username("  ");
        assert_eq!(config.username(), DEFAULT_USERNAME);

        let config = config.with_username("ada");
        assert_eq!(config.username(), "ada");
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let result = SessionConfig::new("lobby").unwrap().with_history_capacity(0);
        assert_eq!(result, Err(ConfigError::ZeroHistoryCapacity));
    }
}
