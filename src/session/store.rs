use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::error::{CoachError, Result};

use super::RetrySession;

/// In-memory map of in-flight retry sessions.
///
/// Operations follow a checkout/restore protocol: the engine removes a
/// session from the map for the duration of one dialogue step and puts it
/// back only if the step ends non-terminal. The expiry sweep therefore can
/// only ever see sessions at rest, which makes "a session mid-transition is
/// not swept" structural rather than a convention.
///
/// A plain mutex around the map is deliberate: sessions never interact with
/// each other, so there is nothing to gain from finer-grained locking.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    inner: Mutex<HashMap<String, RetrySession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh session. Fails if the token is already claimed.
    pub fn create(&self, session: RetrySession) -> Result<()> {
        let mut map = self.lock();
        if map.contains_key(&session.session_id) {
            return Err(CoachError::DuplicateSession(session.session_id));
        }
        map.insert(session.session_id.clone(), session);
        Ok(())
    }

    /// Remove and return a session for exclusive use by one dialogue step.
    pub fn checkout(&self, session_id: &str) -> Option<RetrySession> {
        self.lock().remove(session_id)
    }

    /// Put a checked-out session back after a non-terminal step.
    pub fn restore(&self, session: RetrySession) {
        self.lock().insert(session.session_id.clone(), session);
    }

    /// Idempotent removal; dropping an absent session is not an error.
    pub fn remove(&self, session_id: &str) {
        self.lock().remove(session_id);
    }

    /// Remove and return every session idle for longer than `ttl`.
    ///
    /// Expired sessions are dropped silently; no notification is sent.
    pub fn sweep_expired(&self, now: DateTime<Utc>, ttl: Duration) -> Vec<RetrySession> {
        let mut map = self.lock();
        let expired: Vec<String> = map
            .values()
            .filter(|s| s.is_expired(now, ttl))
            .map(|s| s.session_id.clone())
            .collect();
        expired
            .iter()
            .filter_map(|id| map.remove(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, RetrySession>> {
        // Sessions are plain data; a poisoned lock would only mean another
        // thread panicked mid-insert, and the map is still consistent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
