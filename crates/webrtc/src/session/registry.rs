//! Session registry
//!
//! Maps session ids to live sessions. Mutated concurrently from dispatch
//! tasks (disconnect/stop) and from the negotiation scheduler (offer), so
//! the map sits behind a sync mutex; no `.await` is ever held across it.
//! Teardown itself is not the registry's job: callers detach the entry and
//! then run the async teardown, which keeps the connection from being
//! double-closed.

use super::{PeerSession, SessionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of live sessions keyed by session id
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Arc<PeerSession>>>,
}

impl SessionRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a session, returning any displaced entry for the same id.
    /// The caller must have torn the displaced session down already (the
    /// bridge removes-then-tears-down before installing a replacement).
    pub fn insert(&self, session: Arc<PeerSession>) -> Option<Arc<PeerSession>> {
        let id = session.id().to_string();
        let displaced = self.sessions.lock().insert(id.clone(), session);
        debug!(session_id = %id, displaced = displaced.is_some(), "session registered");
        displaced
    }

    /// Look up a session by id
    pub fn get(&self, id: &str) -> Option<Arc<PeerSession>> {
        self.sessions.lock().get(id).cloned()
    }

    /// Detach a session by id; no-op if absent
    pub fn remove(&self, id: &str) -> Option<Arc<PeerSession>> {
        let removed = self.sessions.lock().remove(id);
        if removed.is_some() {
            debug!(session_id = %id, "session removed from registry");
        }
        removed
    }

    /// Whether a session exists for the id
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.lock().contains_key(id)
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Ids of all live sessions
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.lock().keys().cloned().collect()
    }
}
