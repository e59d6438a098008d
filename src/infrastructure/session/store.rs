//! Conversation session store with per-session in-flight tracking

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::EngineError;
use crate::domain::chat::ChatResponse;
use crate::domain::clock::Clock;
use crate::domain::session::ConversationSession;

type InFlightSet = Arc<Mutex<HashSet<String>>>;

/// Marks a session busy until dropped
#[derive(Debug)]
pub struct InFlightGuard {
    in_flight: InFlightSet,
    session_id: String,
}

impl InFlightGuard {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.session_id);
    }
}

/// Retention bounds of the session store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Oldest exchanges are dropped beyond this many turns
    pub max_turns_per_session: usize,
    /// The least recently active session is evicted beyond this count
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_turns_per_session: 200,
            max_sessions: 1000,
        }
    }
}

#[derive(Debug)]
pub struct SessionStore {
    clock: Arc<dyn Clock>,
    limits: SessionLimits,
    sessions: RwLock<HashMap<String, ConversationSession>>,
    in_flight: InFlightSet,
}

impl SessionStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            limits: SessionLimits::default(),
            sessions: RwLock::new(HashMap::new()),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = SessionLimits {
            max_turns_per_session: limits.max_turns_per_session.max(2),
            max_sessions: limits.max_sessions.max(1),
        };
        self
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    /// Claims the session for one send
    pub fn begin(&self, session_id: &str) -> Result<InFlightGuard, EngineError> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

        if !in_flight.insert(session_id.to_string()) {
            debug!(session_id = %session_id, "Rejecting concurrent send");
            return Err(EngineError::session_busy(session_id));
        }

        Ok(InFlightGuard {
            in_flight: self.in_flight.clone(),
            session_id: session_id.to_string(),
        })
    }

    pub fn is_in_flight(&self, session_id: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(session_id)
    }

    /// Appends a prompt and its response, creating the session if needed
    pub async fn record_exchange(
        &self,
        session_id: &str,
        prompt: &str,
        asked_at: DateTime<Utc>,
        response: &ChatResponse,
    ) {
        let mut sessions = self.sessions.write().await;
        let now = self.clock.now();

        if !sessions.contains_key(session_id) && sessions.len() >= self.limits.max_sessions {
            let idle = sessions
                .iter()
                .min_by_key(|(_, s)| s.last_activity())
                .map(|(id, _)| id.clone());
            if let Some(idle) = idle {
                sessions.remove(&idle);
                debug!(session_id = %idle, "Evicted least recently active session");
            }
        }

        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| ConversationSession::new(session_id, now));
        session.record_exchange(prompt, asked_at, response);

        let dropped = session.trim_to(self.limits.max_turns_per_session);
        if dropped > 0 {
            debug!(session_id = %session_id, dropped, "Trimmed oldest turns");
        }
    }

    pub async fn get(&self, session_id: &str) -> Option<ConversationSession> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn clear(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    pub async fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
