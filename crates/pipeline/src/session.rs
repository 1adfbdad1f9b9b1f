//! Per-sender session state.
//!
//! Sessions are created on a sender's first event and refreshed on every
//! later one. The store is bounded: when it grows past its capacity, idle
//! sessions go first, then the least recently seen.

use std::{collections::HashMap, sync::Mutex, time::Duration};

use {
    chrono::{DateTime, TimeDelta, Utc},
    tracing::debug,
};

use crate::types::SenderId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub sender: SenderId,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Number of events seen from this sender, including the current one.
    pub events: u64,
}

impl Session {
    #[must_use]
    pub fn new(sender: SenderId, now: DateTime<Utc>) -> Self {
        Self {
            sender,
            first_seen: now,
            last_seen: now,
            events: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Upper bound on retained sessions. Always at least one.
    pub capacity: usize,
    /// Sessions not seen for this long are dropped by [`SessionStore::evict_idle`].
    pub idle_ttl: Option<Duration>,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            idle_ttl: Some(Duration::from_secs(24 * 60 * 60)),
        }
    }
}

/// In-memory session store (std::sync::Mutex: never held across `.await`).
pub struct SessionStore {
    sessions: Mutex<HashMap<SenderId, Session>>,
    policy: SessionPolicy,
}

impl SessionStore {
    #[must_use]
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            policy: SessionPolicy {
                capacity: policy.capacity.max(1),
                ..policy
            },
        }
    }

    /// Record an event from `sender` and return the updated session.
    pub fn touch(&self, sender: SenderId, now: DateTime<Utc>) -> Session {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());

        let session = sessions
            .entry(sender)
            .or_insert_with(|| Session::new(sender, now));
        session.last_seen = session.last_seen.max(now);
        session.events += 1;
        let snapshot = session.clone();

        if sessions.len() > self.policy.capacity {
            if let Some(cutoff) = self.idle_cutoff(now) {
                sessions.retain(|id, s| *id == sender || s.last_seen >= cutoff);
            }
            while sessions.len() > self.policy.capacity {
                let Some(oldest) = sessions
                    .values()
                    .filter(|s| s.sender != sender)
                    .min_by_key(|s| s.last_seen)
                    .map(|s| s.sender)
                else {
                    break;
                };
                sessions.remove(&oldest);
                debug!(sender = %oldest, "evicted least recently seen session");
            }
        }

        snapshot
    }

    #[must_use]
    pub fn get(&self, sender: SenderId) -> Option<Session> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.get(&sender).cloned()
    }

    /// Drop sessions idle for longer than the policy's TTL. Returns how many went.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = self.idle_cutoff(now) else {
            return 0;
        };
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, s| s.last_seen >= cutoff);
        before - sessions.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn idle_cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let ttl = TimeDelta::from_std(self.policy.idle_ttl?).ok()?;
        now.checked_sub_signed(ttl)
    }
}
