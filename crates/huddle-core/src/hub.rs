//! Connection hub for Huddle.
//!
//! The hub is the process-wide registry mapping a user to the set of
//! connections currently open for that user (a user may be connected from
//! several devices at once). It is the only state shared across connections;
//! everything else lives inside a single connection's tasks.

use bytes::Bytes;
use dashmap::DashMap;
use huddle_protocol::UserId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, trace};

static CONNECTION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for one open connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate the next connection ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(CONNECTION_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The hub's handle to one connection: its identity plus the sending half of
/// the connection's bounded outbound queue.
///
/// The hub never owns the connection. The queue receiver stays with the
/// connection's outbound task, and unregistration is always triggered by the
/// connection's own teardown path.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    /// Connection identity within the registry.
    pub id: ConnectionId,
    /// Sending half of the connection's outbound queue.
    pub queue: mpsc::Sender<Bytes>,
}

impl ConnectionHandle {
    /// Create a handle with a fresh connection ID.
    #[must_use]
    pub fn new(queue: mpsc::Sender<Bytes>) -> Self {
        Self {
            id: ConnectionId::generate(),
            queue,
        }
    }
}

/// Process-wide registry of open connections, keyed by user.
///
/// Registry reads (fan-out) may run concurrently with each other; any
/// mutation excludes readers and other mutators on the affected shard.
/// Constructed once at server startup and injected into every connection.
#[derive(Debug, Default)]
pub struct Hub {
    clients: DashMap<UserId, HashMap<ConnectionId, mpsc::Sender<Bytes>>>,
}

impl Hub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under a user. Side effect only; cannot fail.
    pub fn register(&self, user: UserId, handle: ConnectionHandle) {
        self.clients
            .entry(user)
            .or_default()
            .insert(handle.id, handle.queue);
        debug!(user, connection = %handle.id, "Connection registered");
    }

    /// Remove a connection from a user's set.
    ///
    /// Idempotent: unregistering an absent connection is a no-op. The user's
    /// entry is removed entirely once its set is empty.
    pub fn unregister(&self, user: UserId, connection: ConnectionId) {
        if let Some(mut entry) = self.clients.get_mut(&user) {
            if entry.remove(&connection).is_some() {
                debug!(user, connection = %connection, "Connection unregistered");
            }
        }
        self.clients.remove_if(&user, |_, conns| conns.is_empty());
    }

    /// Deliver an encoded frame to every connection open for a user.
    ///
    /// Enqueueing is non-blocking: a connection whose outbound queue is full
    /// simply does not get this frame (drop-on-full). A slow consumer must
    /// never stall delivery to other connections or other users.
    ///
    /// Returns the number of connections the frame was enqueued to.
    pub fn send_to_user(&self, user: UserId, frame: &Bytes) -> usize {
        let Some(entry) = self.clients.get(&user) else {
            trace!(user, "No open connections for user");
            return 0;
        };

        let mut delivered = 0;
        for (id, queue) in entry.iter() {
            match queue.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    debug!(user, connection = %id, "Outbound queue full, frame dropped");
                }
            }
        }
        delivered
    }

    /// Number of connections currently open for a user.
    #[must_use]
    pub fn connection_count(&self, user: UserId) -> usize {
        self.clients.get(&user).map(|e| e.len()).unwrap_or(0)
    }

    /// Number of users with at least one open connection.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.clients.len()
    }
}
