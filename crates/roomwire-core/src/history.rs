//! Bounded message history.

use std::collections::VecDeque;

use roomwire_proto::ChatMessage;

/// FIFO of received messages with a fixed capacity.
///
/// Insertion order is arrival order. When full, pushing evicts the oldest
/// message.
///
/// # Invariants
///
/// - `len()` never exceeds the capacity after any operation.
/// - The capacity is at least 1. A zero capacity is clamped to one; callers validate
///   through [`crate::SessionConfig`] before reaching here.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl HistoryBuffer {
    /// Empty buffer holding at most `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { messages: VecDeque::with_capacity(capacity), capacity }
    }

    /// Append a message, returning the evicted one if the buffer was full.
    pub fn push(&mut self, message: ChatMessage) -> Option<ChatMessage> {
        let evicted =
            if self.messages.len() >= self.capacity { self.messages.pop_front() } else { None };
        self.messages.push_back(message);
        evicted
    }

    /// True if a message with this id is buffered.
    pub fn contains_id(&self, id: &str) -> bool {
        self.messages.iter().any(|msg| msg.id == id)
    }

    /// Copy of the buffered messages, oldest first.
    ///
    /// With `Some(limit)` only the `limit` most recent messages are returned,
    /// still oldest first.
    pub fn snapshot(&self, limit: Option<usize>) -> Vec<ChatMessage> {
        let skip = limit.map_or(0, |limit| self.messages.len().saturating_sub(limit));
        self.messages.iter().skip(skip).cloned().collect()
    }

    /// Most recently buffered message.
    pub fn latest(&self) -> Option<&ChatMessage> {
        self.messages.back()
    }

    /// Remove and return everything, oldest first.
    pub fn drain(&mut self) -> Vec<ChatMessage> {
        self.messages.drain(..).collect()
    }

    /// Number of buffered messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            room_id: "lobby".to_string(),
            username: "ada".to_string(),
            address: None,
            message: format!("body {id}"),
            avatar: None,
            timestamp: String::new(),
            kind: None,
            expires_at: None,
        }
    }

    fn ids(messages: &[ChatMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut buffer = HistoryBuffer::new(2);
        assert!(buffer.push(msg("a")).is_none());
        assert!(buffer.push(msg("b")).is_none());

        let evicted = buffer.push(msg("c"));
        assert_eq!(evicted.map(|m| m.id), Some("a".to_string()));
        assert_eq!(ids(&buffer.snapshot(None)), vec!["b", "c"]);
    }

    #[test]
    fn snapshot_limit_keeps_most_recent_in_order() {
        let mut buffer = HistoryBuffer::new(10);
        for id in ["a", "b", "c", "d"] {
            buffer.push(msg(id));
        }

        assert_eq!(ids(&buffer.snapshot(Some(2))), vec!["c", "d"]);
        assert_eq!(ids(&buffer.snapshot(Some(10))), vec!["a", "b", "c", "d"]);
        assert!(buffer.snapshot(Some(0)).is_empty());
    }

    #[test]
    fn latest_and_drain() {
        let mut buffer = HistoryBuffer::new(3);
        assert!(buffer.latest().is_none());

        buffer.push(msg("a"));
        buffer.push(msg("b"));
        assert_eq!(buffer.latest().map(|m| m.id.as_str()), Some("b"));
        assert!(buffer.contains_id("a"));

        assert_eq!(ids(&buffer.drain()), vec!["a", "b"]);
        assert!(buffer.is_empty());
        assert!(!buffer.contains_id("a"));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut buffer = HistoryBuffer::new(0);
        let evicted = ["a", "b", "c"].into_iter().filter_map(|id| buffer.push(msg(id))).count();
        assert_eq!(evicted, 2);
        assert_eq!(buffer.len(), 1);
    }
}
