//! Acknowledgment correlation.
//!
//! The protocol has no request ids beyond a single digit appended to the
//! event prefix (`42<d>` out, `43<d>` back). The correlator hands out those
//! digits cyclically and remembers which logical request each one belongs to,
//! so an incoming ack can be routed to the right continuation.
//!
//! Entries that never get an answer are dropped by [`Correlator::sweep`] once
//! they are older than the TTL. Expiry is silent: the ack id simply becomes
//! unroutable.

use std::{fmt::Debug, ops::Sub, time::Duration};

use roomwire_proto::AckId;

/// Age after which a pending acknowledgment is discarded.
pub const ACK_TTL: Duration = Duration::from_secs(30);

/// How often the session sweeps expired acknowledgments.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Logical request an ack id was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// `joinRoom`
    JoinRoom,
    /// `getMessageHistory`
    GetMessageHistory,
    /// `sendMessage`
    SendMessage,
}

/// One in-flight request awaiting its acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAck<I> {
    /// Correlation id sent with the request.
    pub id: AckId,
    /// Request the id belongs to.
    pub kind: RequestKind,
    /// When the request was sent.
    pub created_at: I,
}

/// Table of in-flight requests keyed by ack id.
///
/// # Invariants
///
/// - At most one entry per ack id. Allocating an id that is still in flight
///   overwrites the older entry; ten concurrent requests is the hard ceiling
///   of the id space.
/// - Ids are issued in strict cyclic order 0, 1, ..., 9, 0, ...
#[derive(Debug, Clone)]
pub struct Correlator<I> {
    slots: [Option<PendingAck<I>>; AckId::SPACE as usize],
    next: AckId,
    ttl: Duration,
}

impl<I> Correlator<I>
where
    I: Copy + Debug + Sub<Output = Duration>,
{
    /// Empty table with the default TTL.
    pub fn new() -> Self {
        Self { slots: std::array::from_fn(|_| None), next: AckId::MIN, ttl: ACK_TTL }
    }

    /// Issue the next cyclic id for `kind`.
    pub fn allocate(&mut self, kind: RequestKind, now: I) -> AckId {
        let id = self.next;
        self.next = id.next();

        let entry = PendingAck { id, kind, created_at: now };
        if let Some(previous) = self.slots[id.index()].replace(entry) {
            tracing::warn!(
                "Ack id {} reused while {:?} still pending; older request is now unroutable",
                id,
                previous.kind
            );
        }

        id
    }

    /// Remove the entry for `id` and return its request kind.
    ///
    /// `None` if the id was never issued, already resolved, or expired.
    pub fn resolve(&mut self, id: AckId) -> Option<RequestKind> {
        self.slots[id.index()].take().map(|entry| entry.kind)
    }

    /// Drop every entry at least `ttl` old. Returns how many were dropped.
    pub fn sweep(&mut self, now: I) -> usize {
        let ttl = self.ttl;
        let mut expired = 0;
        for slot in &mut self.slots {
            if slot.is_some_and(|entry| now - entry.created_at >= ttl) {
                *slot = None;
                expired += 1;
            }
        }
        expired
    }

    /// Pending entry for `id`, if any.
    pub fn pending(&self, id: AckId) -> Option<&PendingAck<I>> {
        self.slots[id.index()].as_ref()
    }

    /// Number of in-flight requests.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// True if nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

impl<I> Default for Correlator<I>
where
    I: Copy + Debug + Sub<Output = Duration>,
{
    fn default() -> Self {
        Self::new()
    }
}
