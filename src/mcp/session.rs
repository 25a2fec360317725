//! Logical client sessions for the HTTP/SSE transport.
//!
//! A session decouples request submission (`POST /request`) from response
//! delivery (the event stream): responses are queued on the session's
//! outbox in completion order and drained by whichever stream connection
//! is currently attached. Sessions survive stream reconnects; they die on
//! explicit close, transport disconnect, or idle timeout.
//!
//! # Invariants
//!
//! - A pending request is removed exactly once: by its correlated
//!   response or by rejection at close/eviction. Completing an id with no
//!   pending entry means the client abandoned it; the response is dropped
//!   silently.
//! - `enqueue`/`close` on an already-closed session are no-ops, because
//!   disconnects and explicit closes can race.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Notify;
use uuid::Uuid;

use super::protocol::{JsonRpcError, RequestId};

/// An event queued for delivery on a session's stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A serialized JSON-RPC response envelope.
    Message(String),
    /// Session teardown, with a human-readable reason.
    Close {
        /// Why the session ended.
        reason: String,
    },
}

/// A request in flight on a session.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    /// The method being handled.
    pub method: String,
    /// When the request was submitted.
    pub submitted_at: Instant,
}

struct Session {
    created_at: DateTime<Utc>,
    last_seen_at: Instant,
    pending: HashMap<RequestId, PendingRequest>,
    outbox: VecDeque<SessionEvent>,
    notify: Arc<Notify>,
    closed: bool,
    // Set by the first sweep that sees this session closed; the next
    // sweep reclaims it even if no stream ever drained the outbox.
    reap_on_next_sweep: bool,
}

impl Session {
    fn new() -> Self {
        Self {
            created_at: Utc::now(),
            last_seen_at: Instant::now(),
            pending: HashMap::new(),
            outbox: VecDeque::new(),
            notify: Arc::new(Notify::new()),
            closed: false,
            reap_on_next_sweep: false,
        }
    }
}

/// Outcome of polling a session's outbox.
enum Poll {
    /// An event is ready.
    Event(SessionEvent),
    /// Nothing queued yet; wait and retry.
    Pending(Arc<Notify>),
    /// The session is closed and drained, or unknown.
    Done,
}

/// Tracks every live session for the HTTP/SSE transport.
///
/// Safe to share behind an `Arc`: the map is concurrent and no lock is
/// held across a suspension point.
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    /// Creates a registry with the given idle eviction window.
    #[must_use]
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
        }
    }

    /// Creates a new session and returns its opaque id.
    #[must_use]
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions.insert(id.clone(), Session::new());
        id
    }

    /// Returns whether a session exists and is not closed.
    #[must_use]
    pub fn is_open(&self, id: &str) -> bool {
        self.sessions.get(id).is_some_and(|s| !s.closed)
    }

    /// Returns a session's creation timestamp.
    #[must_use]
    pub fn created_at(&self, id: &str) -> Option<DateTime<Utc>> {
        self.sessions.get(id).map(|s| s.created_at)
    }

    /// Refreshes a session's activity timestamp.
    pub fn touch(&self, id: &str) {
        if let Some(mut session) = self.sessions.get_mut(id) {
            session.last_seen_at = Instant::now();
        }
    }

    /// Registers a request as pending on a session.
    ///
    /// Returns `false` if the session is unknown or closed.
    pub fn submit(&self, id: &str, request_id: RequestId, method: &str) -> bool {
        let Some(mut session) = self.sessions.get_mut(id) else {
            return false;
        };
        if session.closed {
            return false;
        }
        session.last_seen_at = Instant::now();
        session.pending.insert(
            request_id,
            PendingRequest {
                method: method.to_string(),
                submitted_at: Instant::now(),
            },
        );
        true
    }

    /// Completes a pending request with its serialized response.
    ///
    /// The response is queued only if the request is still pending;
    /// otherwise the client abandoned it and the payload is dropped.
    /// Returns whether the pending entry existed.
    pub fn complete(&self, id: &str, request_id: &RequestId, serialized: String) -> bool {
        let Some(mut session) = self.sessions.get_mut(id) else {
            return false;
        };
        if session.closed || session.pending.remove(request_id).is_none() {
            return false;
        }
        session.outbox.push_back(SessionEvent::Message(serialized));
        session.notify.notify_one();
        true
    }

    /// Queues an event on a session's outbox.
    ///
    /// No-op for unknown or closed sessions.
    pub fn enqueue(&self, id: &str, event: SessionEvent) {
        if let Some(mut session) = self.sessions.get_mut(id) {
            if session.closed {
                return;
            }
            session.outbox.push_back(event);
            session.notify.notify_one();
        }
    }

    /// Closes a session: every outstanding pending request is rejected
    /// with a session-expired error, a close event is queued, and further
    /// enqueues become no-ops.
    ///
    /// Closing twice (or closing an unknown session) is a no-op.
    pub fn close(&self, id: &str, reason: &str) {
        let Some(mut session) = self.sessions.get_mut(id) else {
            return;
        };
        if session.closed {
            return;
        }
        session.closed = true;

        // Reject in one drain so each pending request resolves exactly once.
        let pending = std::mem::take(&mut session.pending);
        for (request_id, entry) in pending {
            tracing::debug!(
                session = id,
                request = %request_id,
                method = %entry.method,
                "rejecting pending request on session close"
            );
            let error = JsonRpcError::session_expired(request_id, reason);
            if let Ok(serialized) = serde_json::to_string(&error) {
                session.outbox.push_back(SessionEvent::Message(serialized));
            }
        }

        session.outbox.push_back(SessionEvent::Close {
            reason: reason.to_string(),
        });
        session.notify.notify_one();
    }

    /// Removes a closed-and-drained session from the registry.
    pub fn remove_if_drained(&self, id: &str) {
        self.sessions
            .remove_if(id, |_, session| session.closed && session.outbox.is_empty());
    }

    /// Waits for the next event on a session's outbox.
    ///
    /// Returns `None` once the session is closed and fully drained, or if
    /// the session does not exist. Producers signal with `notify_one`,
    /// which stores a permit, so an event queued between the poll and the
    /// park is never missed.
    pub async fn next_event(&self, id: &str) -> Option<SessionEvent> {
        loop {
            match self.poll_event(id) {
                Poll::Event(event) => return Some(event),
                Poll::Done => return None,
                Poll::Pending(notify) => notify.notified().await,
            }
        }
    }

    fn poll_event(&self, id: &str) -> Poll {
        let Some(mut session) = self.sessions.get_mut(id) else {
            return Poll::Done;
        };
        if let Some(event) = session.outbox.pop_front() {
            return Poll::Event(event);
        }
        if session.closed {
            return Poll::Done;
        }
        Poll::Pending(session.notify.clone())
    }

    /// Closes every session idle beyond the eviction window and reclaims
    /// closed sessions.
    ///
    /// A closed, drained session goes immediately. A closed session with
    /// an undrained outbox survives exactly one more sweep — grace for a
    /// stream that is mid-drain — and is then discarded whether or not a
    /// stream ever attached, so abandoned clients cannot grow the map.
    pub fn sweep(&self) {
        let now = Instant::now();
        let idle: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| {
                !entry.value().closed
                    && now.duration_since(entry.value().last_seen_at) > self.idle_timeout
            })
            .map(|entry| entry.key().clone())
            .collect();

        for id in idle {
            tracing::info!(session = %id, "evicting idle session");
            self.close(&id, "idle timeout");
        }

        self.sessions.retain(|id, session| {
            if !session.closed {
                return true;
            }
            if session.outbox.is_empty() {
                return false;
            }
            if session.reap_on_next_sweep {
                tracing::debug!(session = %id, "discarding undrained outbox of abandoned session");
                return false;
            }
            session.reap_on_next_sweep = true;
            true
        });
    }

    /// Number of live sessions (including closed-but-undrained ones).
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns whether no sessions are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Runs the periodic eviction sweep until the registry is dropped.
pub async fn run_eviction(registry: Arc<SessionRegistry>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        registry.sweep();
    }
}
