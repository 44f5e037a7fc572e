//! Session state machine.
//!
//! Owns the whole client-side lifecycle of one room session: transport
//! bring-up, handshake, room join, history fetch, steady state and recovery.
//! Follows the action pattern: [`Session::handle`] takes one
//! [`SessionEvent`] and returns the [`SessionAction`]s the driver must
//! execute, in order. No I/O happens here.
//!
//! # State Machine
//!
//! ```text
//!  connect / delay elapsed        transport open           frame 0
//! Disconnected ──────────> Connecting ──────────> Handshaking ──────────> Joining
//!      ↑                      │ open failed                                  │
//!      ├──────────────────────┘                    join ack or setCookie     │
//!      │                                                                     ↓
//!      │   close / 41 / disconnect        Active <────────── FetchingHistory
//!      └──────────────────────────────── (any)     history ack
//! ```
//!
//! Inbound frames are handled by kind regardless of state; the state only
//! gates which outbound requests get issued. A `newMessage` that arrives
//! while still joining is buffered like any other.

use std::time::Duration;

use roomwire_proto::{
    ChatMessage, Frame, Handshake, ServerEvent,
    payloads::{
        ClientRequest, ConnectInfo, GetMessageHistory, JoinRoom, SendMessage, ack_error,
        decode_history, history_array,
    },
};
use serde_json::Value;

use crate::{
    config::SessionConfig,
    correlator::{Correlator, RequestKind, SWEEP_INTERVAL},
    env::Environment,
    event::{SessionAction, SessionEvent, SessionNotice},
    history::HistoryBuffer,
    keepalive::Keepalive,
    reconnect::ReconnectPolicy,
};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No transport. Initial state, and the state after any failure.
    Disconnected,
    /// Transport requested, not yet open.
    Connecting,
    /// Transport open, waiting for the server's connect info.
    Handshaking,
    /// Handshake sent, waiting for the room join to be confirmed.
    Joining,
    /// Join confirmed, waiting for the history response.
    FetchingHistory,
    /// Fully joined. The only state in which messages can be sent.
    Active,
}

/// One client session with one room.
///
/// # Invariants
///
/// - The keepalive is stopped whenever the state is `Disconnected`.
/// - A reconnect is pending only while `Disconnected` and only if the caller
///   did not ask to disconnect.
/// - `GaveUp` is emitted at most once between explicit connects.
pub struct Session<E: Environment> {
    env: E,
    config: SessionConfig,
    state: ConnectionState,
    correlator: Correlator<E::Instant>,
    history: HistoryBuffer,
    keepalive: Keepalive<E::Instant>,
    reconnect: ReconnectPolicy,
    /// When the pending reconnect was scheduled and how long it waits.
    pending_reconnect: Option<(E::Instant, Duration)>,
    last_sweep: E::Instant,
    /// Set by an explicit disconnect; cleared by an explicit connect.
    caller_closed: bool,
    gave_up: bool,
}

impl<E: Environment> Session<E> {
    /// Create a disconnected session.
    pub fn new(env: E, config: SessionConfig) -> Self {
        let now = env.now();
        let history = HistoryBuffer::new(config.history_capacity());
        Self {
            env,
            config,
            state: ConnectionState::Disconnected,
            correlator: Correlator::new(),
            history,
            keepalive: Keepalive::new(),
            reconnect: ReconnectPolicy::new(),
            pending_reconnect: None,
            last_sweep: now,
            caller_closed: false,
            gave_up: false,
        }
    }

    /// Process one event and return the actions to execute.
    pub fn handle(&mut self, event: SessionEvent<E::Instant>) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        match event {
            SessionEvent::Connect => self.on_connect(&mut actions),
            SessionEvent::Disconnect => self.on_disconnect(&mut actions),
            SessionEvent::SendMessage { text } => self.on_send_message(text, &mut actions),
            SessionEvent::TransportOpened => self.on_transport_opened(&mut actions),
            SessionEvent::TransportFailed { reason } => {
                self.on_transport_failed(&reason, &mut actions);
            },
            SessionEvent::TransportClosed { reason } => {
                if self.state == ConnectionState::Disconnected {
                    tracing::trace!("Ignoring transport close while disconnected: {}", reason);
                } else {
                    self.enter_disconnected(reason, &mut actions);
                }
            },
            SessionEvent::FrameReceived(text) => self.on_frame_text(&text, &mut actions),
            SessionEvent::Tick { now } => self.on_tick(now, &mut actions),
        }
        actions
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// True only in [`ConnectionState::Active`].
    pub fn is_active(&self) -> bool {
        self.state == ConnectionState::Active
    }

    /// Snapshot of the `limit` most recent messages (all if `None`), oldest
    /// first.
    pub fn messages(&self, limit: Option<usize>) -> Vec<ChatMessage> {
        self.history.snapshot(limit)
    }

    /// Most recent buffered message.
    pub fn latest_message(&self) -> Option<&ChatMessage> {
        self.history.latest()
    }

    /// Remove and return every buffered message, oldest first.
    pub fn drain_messages(&mut self) -> Vec<ChatMessage> {
        self.history.drain()
    }

    /// Requests still waiting for an acknowledgment.
    pub fn pending_requests(&self) -> usize {
        self.correlator.len()
    }

    /// Reconnect attempts since the last successful connection.
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect.attempts()
    }

    /// True while a reconnect delay is running.
    pub fn reconnect_pending(&self) -> bool {
        self.pending_reconnect.is_some()
    }

    /// Active keepalive interval, if the keepalive is running.
    pub fn keepalive_interval(&self) -> Option<Duration> {
        self.keepalive.interval()
    }

    fn on_connect(&mut self, actions: &mut Vec<SessionAction>) {
        if self.state != ConnectionState::Disconnected {
            tracing::debug!("Connect ignored in {:?}", self.state);
            return;
        }

        self.caller_closed = false;
        self.gave_up = false;
        self.pending_reconnect = None;
        self.reconnect.reset();

        self.start_connecting(actions);
    }

    fn on_disconnect(&mut self, actions: &mut Vec<SessionAction>) {
        self.caller_closed = true;
        self.pending_reconnect = None;
        self.keepalive.stop();

        if self.state == ConnectionState::Disconnected {
            return;
        }

        actions.push(SessionAction::CloseTransport);
        self.enter_disconnected("client disconnect".to_string(), actions);
    }

    fn on_send_message(&mut self, text: String, actions: &mut Vec<SessionAction>) {
        if !self.is_active() {
            tracing::warn!("Dropping outbound message in {:?}", self.state);
            actions.push(SessionAction::Notify(SessionNotice::SendRejected { state: self.state }));
            return;
        }

        let request = ClientRequest::SendMessage(SendMessage {
            room_id: self.config.room_id().to_string(),
            message: text,
            username: self.config.username().to_string(),
        });
        self.send_request(RequestKind::SendMessage, request, actions);
    }

    fn on_transport_opened(&mut self, actions: &mut Vec<SessionAction>) {
        if self.state != ConnectionState::Connecting {
            tracing::warn!("Unexpected transport open in {:?}", self.state);
            return;
        }

        tracing::info!("Transport open, awaiting connect info");
        self.reconnect.reset();
        self.transition(ConnectionState::Handshaking);
        actions.push(SessionAction::Notify(SessionNotice::Connected));
    }

    fn on_transport_failed(&mut self, reason: &str, actions: &mut Vec<SessionAction>) {
        if self.state != ConnectionState::Connecting {
            tracing::debug!("Ignoring stale transport failure: {}", reason);
            return;
        }

        tracing::warn!("Transport failed to open: {}", reason);
        self.keepalive.stop();
        self.transition(ConnectionState::Disconnected);
        if !self.caller_closed {
            self.schedule_reconnect(actions);
        }
    }

    fn on_frame_text(&mut self, text: &str, actions: &mut Vec<SessionAction>) {
        if self.state == ConnectionState::Disconnected {
            tracing::trace!("Dropping frame received without a transport");
            return;
        }

        match Frame::decode(text) {
            Ok(Some(frame)) => self.on_frame(frame, actions),
            Ok(None) => tracing::trace!("Dropping frame with unrecognized prefix"),
            Err(e) => tracing::warn!("Discarding malformed frame: {}", e),
        }
    }

    fn on_frame(&mut self, frame: Frame, actions: &mut Vec<SessionAction>) {
        match frame {
            Frame::Open(info) => self.on_open(&info, actions),
            Frame::Connect(_) => self.on_handshake_accepted(actions),
            Frame::Disconnect(reason) => {
                if self.state == ConnectionState::Disconnected {
                    return;
                }
                let reason = reason.map_or_else(
                    || "server disconnect".to_string(),
                    |value| format!("server disconnect: {value}"),
                );
                actions.push(SessionAction::CloseTransport);
                self.enter_disconnected(reason, actions);
            },
            Frame::Event { name, args, .. } => match ServerEvent::from_event(&name, args) {
                Ok(event) => self.on_server_event(event, actions),
                Err(e) => tracing::warn!("Discarding event: {}", e),
            },
            Frame::Ack { id, payload } => {
                let kind = id.and_then(|id| self.correlator.resolve(id));
                self.on_ack(kind, &payload, actions);
            },
            Frame::Ping => {
                tracing::trace!("Ping, answering with pong");
                actions.push(SessionAction::Send(Frame::Pong));
            },
            Frame::Pong => tracing::trace!("Pong"),
        }
    }

    fn on_open(&mut self, info: &Value, actions: &mut Vec<SessionAction>) {
        let info = ConnectInfo::from_value(info);
        if let Some(millis) = info.ping_interval {
            self.keepalive.start(self.env.now(), Duration::from_millis(millis));
        }

        let handshake = Handshake::new(self.config.origin(), self.env.wall_clock_millis());
        match handshake.into_frame() {
            Ok(frame) => actions.push(SessionAction::Send(frame)),
            Err(e) => {
                tracing::error!("Failed to build handshake: {}", e);
                return;
            },
        }

        if self.state == ConnectionState::Handshaking {
            self.transition(ConnectionState::Joining);
        }
    }

    fn on_handshake_accepted(&mut self, actions: &mut Vec<SessionAction>) {
        if !matches!(self.state, ConnectionState::Handshaking | ConnectionState::Joining) {
            tracing::debug!("Handshake ack ignored in {:?}", self.state);
            return;
        }

        let request = ClientRequest::JoinRoom(JoinRoom {
            room_id: self.config.room_id().to_string(),
            username: self.config.username().to_string(),
        });
        self.send_request(RequestKind::JoinRoom, request, actions);
        self.transition(ConnectionState::Joining);
    }

    fn on_server_event(&mut self, event: ServerEvent, actions: &mut Vec<SessionAction>) {
        match event {
            ServerEvent::SetCookie(_) => {
                if self.state == ConnectionState::Joining {
                    tracing::debug!("setCookie while joining, treating as join confirmation");
                    self.request_history(actions);
                }
            },
            ServerEvent::NewMessage(message) => {
                self.history.push(message.clone());
                actions.push(SessionAction::Notify(SessionNotice::MessageReceived(message)));
            },
            ServerEvent::UserLeft(info) => {
                actions.push(SessionAction::Notify(SessionNotice::UserLeft(info)));
            },
            ServerEvent::Other { name } => tracing::debug!("Ignoring event {}", name),
        }
    }

    fn on_ack(
        &mut self,
        kind: Option<RequestKind>,
        payload: &Value,
        actions: &mut Vec<SessionAction>,
    ) {
        match kind {
            Some(RequestKind::JoinRoom) => {
                self.report_ack_error(payload, actions);
                if self.state == ConnectionState::Joining {
                    self.request_history(actions);
                }
            },
            Some(RequestKind::GetMessageHistory) => self.complete_history(payload, true, actions),
            Some(RequestKind::SendMessage) => self.report_ack_error(payload, actions),
            None if self.state == ConnectionState::FetchingHistory => {
                self.complete_history(payload, false, actions);
            },
            None => tracing::debug!("Dropping unroutable ack"),
        }
    }

    fn report_ack_error(&self, payload: &Value, actions: &mut Vec<SessionAction>) {
        if let Some(message) = ack_error(payload) {
            tracing::warn!("Server reported error: {}", message);
            actions.push(SessionAction::Notify(SessionNotice::ServerError { message }));
        }
    }

    fn request_history(&mut self, actions: &mut Vec<SessionAction>) {
        let request = ClientRequest::GetMessageHistory(GetMessageHistory {
            room_id: self.config.room_id().to_string(),
            before: None,
            limit: self.config.history_capacity(),
        });
        self.send_request(RequestKind::GetMessageHistory, request, actions);
        self.transition(ConnectionState::FetchingHistory);
    }

    /// Merge a history reply into the buffer and finish the join.
    ///
    /// An uncorrelated ack only counts as the reply when it yields at least
    /// one message or an empty array. Status acks such as `[{"error":null}]`
    /// leave the fetch pending.
    fn complete_history(
        &mut self,
        payload: &Value,
        correlated: bool,
        actions: &mut Vec<SessionAction>,
    ) {
        let Some(items) = history_array(payload) else {
            tracing::debug!("Ack carries no message array");
            return;
        };

        let (messages, skipped) = decode_history(items);
        if !correlated && messages.is_empty() && skipped > 0 {
            tracing::debug!("Uncorrelated ack holds no messages, still awaiting history");
            return;
        }
        if skipped > 0 {
            tracing::warn!("Skipped {} undecodable history entries", skipped);
        }

        // Reconnects refetch history the buffer may already hold
        let mut added = Vec::with_capacity(messages.len());
        for message in messages {
            if !self.history.contains_id(&message.id) {
                self.history.push(message.clone());
                added.push(message);
            }
        }
        // Oversized replies evict their own oldest entries
        added.retain(|message| self.history.contains_id(&message.id));

        if self.state != ConnectionState::FetchingHistory {
            tracing::debug!("Merged {} late history entries", added.len());
            return;
        }

        tracing::info!("Joined room {} with {} new messages", self.config.room_id(), added.len());
        self.reconnect.reset();
        self.transition(ConnectionState::Active);
        actions.push(SessionAction::Notify(SessionNotice::HistoryReady(added)));
    }

    fn send_request(
        &mut self,
        kind: RequestKind,
        request: ClientRequest,
        actions: &mut Vec<SessionAction>,
    ) {
        let id = self.correlator.allocate(kind, self.env.now());
        match request.into_frame(id) {
            Ok(frame) => actions.push(SessionAction::Send(frame)),
            Err(e) => {
                self.correlator.resolve(id);
                tracing::error!("Failed to encode {:?} request: {}", kind, e);
            },
        }
    }

    fn on_tick(&mut self, now: E::Instant, actions: &mut Vec<SessionAction>) {
        if self.keepalive.poll(now) {
            tracing::trace!("Keepalive ping");
            actions.push(SessionAction::Send(Frame::Ping));
        }

        if now - self.last_sweep >= SWEEP_INTERVAL {
            self.last_sweep = now;
            let expired = self.correlator.sweep(now);
            if expired > 0 {
                tracing::debug!("Expired {} unanswered requests", expired);
            }
        }

        if let Some((scheduled_at, delay)) = self.pending_reconnect {
            if now - scheduled_at >= delay && self.state == ConnectionState::Disconnected {
                self.pending_reconnect = None;
                tracing::info!("Reconnect attempt {}", self.reconnect.attempts());
                self.start_connecting(actions);
            }
        }
    }

    fn start_connecting(&mut self, actions: &mut Vec<SessionAction>) {
        self.transition(ConnectionState::Connecting);
        actions.push(SessionAction::OpenTransport);
    }

    fn enter_disconnected(&mut self, reason: String, actions: &mut Vec<SessionAction>) {
        tracing::info!("Disconnected: {}", reason);
        self.keepalive.stop();
        self.transition(ConnectionState::Disconnected);
        actions.push(SessionAction::Notify(SessionNotice::Disconnected { reason }));

        if !self.caller_closed {
            self.schedule_reconnect(actions);
        }
    }

    fn schedule_reconnect(&mut self, actions: &mut Vec<SessionAction>) {
        if let Some(delay) = self.reconnect.next_delay() {
            let attempt = self.reconnect.attempts();
            tracing::warn!("Reconnecting in {:?} (attempt {})", delay, attempt);
            self.pending_reconnect = Some((self.env.now(), delay));
            actions.push(SessionAction::Notify(SessionNotice::Reconnecting { attempt, delay }));
        } else if !self.gave_up {
            let attempts = self.reconnect.attempts();
            tracing::error!("Giving up after {} reconnect attempts", attempts);
            self.gave_up = true;
            self.pending_reconnect = None;
            actions.push(SessionAction::Notify(SessionNotice::GaveUp { attempts }));
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        if self.state != next {
            tracing::debug!("Session {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}
