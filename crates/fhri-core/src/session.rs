// ─────────────────────────────────────────────────────────────────────
// FHRI Reliability Kernel — Session Registry
// ─────────────────────────────────────────────────────────────────────
//! Session-keyed ownership of `ConversationState`.
//!
//! One `parking_lot::Mutex` per session serializes that session's turns;
//! the registry map lock is held only long enough to look up or insert a
//! handle, so independent sessions never contend on each other's turns.
//! A session idle for longer than the TTL is handed back fresh, with a
//! warning, instead of smoothing against a stale history.
//!
//! Checkouts also sweep idle sessions out of the map, at most once per
//! TTL, so the registry stays bounded without a background task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use fhri_types::{ConversationState, FusionConfig};

struct SessionEntry {
    state: Arc<Mutex<ConversationState>>,
    last_seen: Instant,
}

struct Sessions {
    entries: HashMap<String, SessionEntry>,
    last_sweep: Option<Instant>,
}

impl Sessions {
    fn sweep(&mut self, keep: &str, now: Instant, ttl: Duration) {
        let due = self
            .last_sweep
            .map_or(true, |at| now.saturating_duration_since(at) > ttl);
        if !due {
            return;
        }
        self.last_sweep = Some(now);
        let before = self.entries.len();
        self.entries
            .retain(|id, e| id == keep || now.saturating_duration_since(e.last_seen) <= ttl);
        let evicted = before - self.entries.len();
        if evicted > 0 {
            log::debug!("Evicted {evicted} idle session(s)");
        }
    }
}

/// Checked-out session: lock `state` for the duration of one turn.
pub struct SessionHandle {
    pub state: Arc<Mutex<ConversationState>>,
    /// Set when an expired session was reset on checkout.
    pub reset_warning: Option<String>,
}

/// Registry of live conversations.
pub struct SessionRegistry {
    sessions: Mutex<Sessions>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(Sessions {
                entries: HashMap::new(),
                last_sweep: None,
            }),
            ttl,
        }
    }

    pub fn from_config(config: &FusionConfig) -> Self {
        Self::new(Duration::from_secs(config.session_ttl_secs))
    }

    /// Check out a session, creating it on first use.
    pub fn checkout(&self, session_id: &str) -> SessionHandle {
        self.checkout_at(session_id, Instant::now())
    }

    /// [`checkout`](Self::checkout) with an explicit clock reading.
    pub fn checkout_at(&self, session_id: &str, now: Instant) -> SessionHandle {
        let mut sessions = self.sessions.lock();
        sessions.sweep(session_id, now, self.ttl);
        let entry = sessions
            .entries
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry {
                state: Arc::new(Mutex::new(ConversationState::new())),
                last_seen: now,
            });

        let idle = now.saturating_duration_since(entry.last_seen);
        entry.last_seen = now;
        let state = Arc::clone(&entry.state);
        drop(sessions);

        let mut reset_warning = None;
        if idle > self.ttl {
            let mut guard = state.lock();
            if !guard.is_fresh() {
                log::info!(
                    "Session '{session_id}' idle for {}s, starting fresh",
                    idle.as_secs()
                );
                guard.reset();
                reset_warning = Some(format!(
                    "stale conversation state: session idle {}s, history reset",
                    idle.as_secs()
                ));
            }
        }

        SessionHandle {
            state,
            reset_warning,
        }
    }

    /// Drop a session's state. Returns whether it existed.
    pub fn end_session(&self, session_id: &str) -> bool {
        self.sessions.lock().entries.remove(session_id).is_some()
    }

    /// Remove every session idle for longer than the TTL.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.entries.len();
        sessions
            .entries
            .retain(|_, e| now.saturating_duration_since(e.last_seen) <= self.ttl);
        sessions.last_sweep = Some(now);
        before - sessions.entries.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::from_config(&FusionConfig::default())
    }
}
