use std::collections::HashMap;
use std::fmt;

/// Opaque handle for one admitted connection.
///
/// Used as a map key, for sender exclusion during broadcast, and to identify
/// the connection during disconnect cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Event name -> ordered subscriber list, plus a reverse index per connection
/// for O(k) disconnect cleanup.
///
/// Invariants held after every operation:
/// - a connection appears in `by_event[e]` iff `e` is in its reverse index,
/// - an event with no subscribers has no `by_event` entry at all.
///
/// Plain sync struct; the server serializes access behind its state lock.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    by_event: HashMap<String, Vec<ConnectionId>>,
    by_conn: HashMap<ConnectionId, Vec<String>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent. Returns true only when the subscription was actually added,
    /// so the caller notifies exactly once per real mutation.
    pub fn subscribe(&mut self, conn: ConnectionId, event: &str) -> bool {
        let events = self.by_conn.entry(conn).or_default();
        if events.iter().any(|e| e == event) {
            return false;
        }
        events.push(event.to_string());
        self.by_event.entry(event.to_string()).or_default().push(conn);
        true
    }

    /// Idempotent. Returns true only when the subscription actually existed.
    /// Prunes the event entry when its last subscriber leaves.
    pub fn unsubscribe(&mut self, conn: ConnectionId, event: &str) -> bool {
        let Some(events) = self.by_conn.get_mut(&conn) else {
            return false;
        };
        let Some(pos) = events.iter().position(|e| e == event) else {
            return false;
        };
        events.remove(pos);
        if events.is_empty() {
            self.by_conn.remove(&conn);
        }
        if let Some(subs) = self.by_event.get_mut(event) {
            if let Some(idx) = subs.iter().position(|c| *c == conn) {
                subs.remove(idx);
            }
            if subs.is_empty() {
                self.by_event.remove(event);
            }
        }
        true
    }

    /// Removes every subscription held by `conn`, returning the affected
    /// events in subscription order so each removal can be reported
    /// individually. Iterates a snapshot since `unsubscribe` mutates the
    /// live reverse index.
    pub fn remove_connection(&mut self, conn: ConnectionId) -> Vec<String> {
        let snapshot = self.by_conn.get(&conn).cloned().unwrap_or_default();
        let mut removed = Vec::with_capacity(snapshot.len());
        for event in snapshot {
            if self.unsubscribe(conn, &event) {
                removed.push(event);
            }
        }
        removed
    }

    /// Current subscribers of `event`, in subscription order. Empty slice for
    /// an event nobody listens to.
    pub fn subscribers(&self, event: &str) -> &[ConnectionId] {
        self.by_event.get(event).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Events `conn` currently listens to, in subscription order.
    pub fn subscriptions(&self, conn: ConnectionId) -> &[String] {
        self.by_conn.get(&conn).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct event names with at least one subscriber.
    pub fn event_count(&self) -> usize {
        self.by_event.len()
    }

    /// Total number of (connection, event) subscription pairs.
    pub fn subscription_count(&self) -> usize {
        self.by_event.values().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.by_event.clear();
        self.by_conn.clear();
    }
}
