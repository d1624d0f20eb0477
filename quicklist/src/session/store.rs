//! Per-user sessions, each owning its own task list.
//!
//! The store replaces any page-wide state: every request names its session
//! and only ever sees that session's [`TaskList`].

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::tasks::TaskList;

/// Identifier of a session (UUIDv7, time-ordered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parse an id from its string form.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim()).ok().map(Self)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One user's isolated interaction lifetime.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub tasks: TaskList,
    pub created_at: DateTime<Utc>,
    /// Last time the session was read or mutated through the store.
    pub last_active: DateTime<Utc>,
}

impl Session {
    fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            tasks: TaskList::new(),
            created_at: now,
            last_active: now,
        }
    }
}

/// All live sessions.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<SessionId, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session with an empty task list.
    pub fn create(&mut self) -> SessionId {
        let id = SessionId::generate();
        self.sessions.insert(id, Session::new(id));
        info!(session = %id, "session started");
        id
    }

    /// Get a session without refreshing its activity time.
    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Get a session for an interaction, marking it active.
    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        let session = self.sessions.get_mut(id)?;
        session.last_active = Utc::now();
        Some(session)
    }

    /// Discard a session and its tasks. Returns whether it existed.
    pub fn end(&mut self, id: &SessionId) -> bool {
        let Some(session) = self.sessions.remove(id) else {
            return false;
        };
        let age = Utc::now().signed_duration_since(session.created_at);
        info!(
            session = %session.id,
            age_secs = age.num_seconds(),
            tasks = session.tasks.len(),
            "session ended"
        );
        true
    }

    /// Discard sessions idle for longer than `ttl` as of `now`.
    ///
    /// Returns how many sessions were evicted.
    pub fn evict_idle(&mut self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| now.signed_duration_since(session.last_active) <= ttl);
        let evicted = before - self.sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = self.sessions.len(), "evicted idle sessions");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_round_trips_through_string() {
        let id = SessionId::generate();
        assert_eq!(SessionId::parse(&id.to_string()), Some(id));
        assert_eq!(SessionId::parse("not-a-uuid"), None);
    }

    #[test]
    fn sessions_are_isolated() {
        let mut store = SessionStore::new();
        let alice = store.create();
        let bob = store.create();

        store
            .get_mut(&alice)
            .unwrap()
            .tasks
            .add("Buy milk")
            .unwrap();

        assert_eq!(store.get(&alice).unwrap().tasks.len(), 1);
        assert!(store.get(&bob).unwrap().tasks.is_empty());
    }

    #[test]
    fn ending_a_session_discards_it() {
        let mut store = SessionStore::new();
        let id = store.create();

        assert!(store.end(&id));
        assert!(store.get(&id).is_none());
        assert!(!store.end(&id));
    }

    #[test]
    fn evict_idle_drops_only_stale_sessions() {
        let mut store = SessionStore::new();
        let stale = store.create();
        let fresh = store.create();

        let later = Utc::now() + TimeDelta::minutes(45);
        store.sessions.get_mut(&fresh).unwrap().last_active = later;

        let evicted = store.evict_idle(later, Duration::from_secs(30 * 60));
        assert_eq!(evicted, 1);
        assert!(store.get(&stale).is_none());
        assert!(store.get(&fresh).is_some());
    }

    #[test]
    fn get_mut_refreshes_activity_and_get_does_not() {
        let mut store = SessionStore::new();
        let id = store.create();
        let earlier = Utc::now() - TimeDelta::minutes(10);
        store.sessions.get_mut(&id).unwrap().last_active = earlier;

        assert_eq!(store.get(&id).unwrap().last_active, earlier);

        let touched = store.get_mut(&id).unwrap().last_active;
        assert!(touched > earlier);
        assert_eq!(store.get(&id).unwrap().last_active, touched);
    }

    #[test]
    fn touched_session_survives_eviction() {
        let mut store = SessionStore::new();
        let idle = store.create();
        let busy = store.create();
        let earlier = Utc::now() - TimeDelta::minutes(10);
        for session in store.sessions.values_mut() {
            session.last_active = earlier;
        }

        store.get_mut(&busy).unwrap();

        let evicted = store.evict_idle(Utc::now(), Duration::from_secs(5 * 60));
        assert_eq!(evicted, 1);
        assert!(store.get(&idle).is_none());
        assert!(store.get(&busy).is_some());
    }

    #[test]
    fn evict_idle_keeps_active_sessions() {
        let mut store = SessionStore::new();
        store.create();
        assert_eq!(store.evict_idle(Utc::now(), Duration::from_secs(60)), 0);
        assert_eq!(store.len(), 1);
    }
}
