// ABOUTME: Shared application state for the blogsmith HTTP server.
// ABOUTME: Holds the per-browser session actors, evicts idle ones, and owns the crew runner.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use blogsmith_agent::CrewRunner;
use blogsmith_core::{RunState, SessionHandle, spawn};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use ulid::Ulid;

/// A registered session and when a request last touched it.
pub struct SessionEntry {
    pub handle: SessionHandle,
    last_access: Instant,
}

impl SessionEntry {
    fn new(handle: SessionHandle) -> Self {
        Self {
            handle,
            last_access: Instant::now(),
        }
    }

    fn idle_for(&self, max_idle: Duration) -> bool {
        self.last_access.elapsed() >= max_idle
    }
}

/// Shared application state accessible by all Axum handlers.
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<Ulid, SessionEntry>>>,
    pub runner: Arc<CrewRunner>,
}

/// Type alias for the Arc-wrapped state used with Axum's State extractor.
pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(runner: Arc<CrewRunner>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            runner,
        }
    }

    /// Spawn a fresh session actor with empty RunState and register it.
    pub async fn create_session(&self) -> SessionHandle {
        let session_id = Ulid::new();
        let handle = spawn(session_id, RunState::new());
        self.sessions
            .write()
            .await
            .insert(session_id, SessionEntry::new(handle.clone()));
        tracing::debug!(%session_id, "session created");
        handle
    }

    /// Look up a session and mark it as recently used.
    pub async fn session(&self, session_id: &Ulid) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(session_id)?;
        entry.last_access = Instant::now();
        Some(entry.handle.clone())
    }

    /// Drop sessions untouched for `max_idle` that are not generating.
    /// Returns how many were removed. Their actors stop once the last handle goes.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let stale: Vec<(Ulid, SessionHandle)> = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|(_, entry)| entry.idle_for(max_idle))
            .map(|(id, entry)| (*id, entry.handle.clone()))
            .collect();

        let mut idle = Vec::with_capacity(stale.len());
        for (session_id, handle) in stale {
            let generating = handle.read_state().await.generating;
            if !generating {
                idle.push(session_id);
            }
        }
        if idle.is_empty() {
            return 0;
        }

        let mut sessions = self.sessions.write().await;
        let mut removed = 0;
        for session_id in idle {
            // A request may have touched it since the first pass.
            if sessions
                .get(&session_id)
                .is_some_and(|entry| entry.idle_for(max_idle))
            {
                sessions.remove(&session_id);
                removed += 1;
            }
        }
        removed
    }
}

/// Periodically evict idle sessions. Stops once the state itself is dropped.
pub fn spawn_session_sweeper(
    state: Weak<AppState>,
    every: Duration,
    max_idle: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(state) = state.upgrade() else {
                break;
            };
            let removed = state.evict_idle(max_idle).await;
            if removed > 0 {
                let remaining = state.sessions.read().await.len();
                tracing::debug!(removed, remaining, "evicted idle sessions");
            }
        }
    })
}
