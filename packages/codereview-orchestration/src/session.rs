use crate::error::{ErrorCategory, OrchestratorError, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Lifecycle of a review session
///
/// ```text
/// Pending → Running → Suspended | Completed | Failed
/// Suspended | Failed | Completed → Running
/// Pending | Running | Suspended | Failed → Abandoned
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionState {
    Pending {
        created_at: DateTime<Utc>,
    },
    Running {
        started_at: DateTime<Utc>,
        attempt: u32,
    },
    Suspended {
        suspended_at: DateTime<Utc>,
        node: String,
        reason: String,
    },
    Completed {
        completed_at: DateTime<Utc>,
        duration_ms: u64,
        rounds: u32,
    },
    Failed {
        failed_at: DateTime<Utc>,
        error: String,
        error_category: ErrorCategory,
    },
    Abandoned {
        abandoned_at: DateTime<Utc>,
        reason: String,
    },
}

impl SessionState {
    pub fn state_name(&self) -> &'static str {
        match self {
            SessionState::Pending { .. } => "pending",
            SessionState::Running { .. } => "running",
            SessionState::Suspended { .. } => "suspended",
            SessionState::Completed { .. } => "completed",
            SessionState::Failed { .. } => "failed",
            SessionState::Abandoned { .. } => "abandoned",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed { .. } | SessionState::Abandoned { .. }
        )
    }
}

/// One review session as seen by the driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub language: Option<String>,
    pub state: SessionState,
    /// Number of graph runs started for this session
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            language: None,
            state: SessionState::Pending { created_at: now },
            attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn invalid(&self, to: &str) -> OrchestratorError {
        OrchestratorError::InvalidStateTransition {
            from: self.state.state_name().to_string(),
            to: to.to_string(),
        }
    }

    /// Transition: PENDING | SUSPENDED | FAILED | COMPLETED → RUNNING
    pub fn start(&mut self) -> Result<()> {
        match &self.state {
            SessionState::Pending { .. }
            | SessionState::Suspended { .. }
            | SessionState::Failed { .. }
            | SessionState::Completed { .. } => {
                let now = Utc::now();
                self.attempts += 1;
                self.state = SessionState::Running {
                    started_at: now,
                    attempt: self.attempts,
                };
                self.updated_at = now;
                Ok(())
            }
            _ => Err(self.invalid("running")),
        }
    }

    /// Transition: RUNNING → SUSPENDED
    pub fn suspend(&mut self, node: &str, reason: &str) -> Result<()> {
        match &self.state {
            SessionState::Running { .. } => {
                let now = Utc::now();
                self.state = SessionState::Suspended {
                    suspended_at: now,
                    node: node.to_string(),
                    reason: reason.to_string(),
                };
                self.updated_at = now;
                Ok(())
            }
            _ => Err(self.invalid("suspended")),
        }
    }

    /// Transition: RUNNING → COMPLETED
    pub fn complete(&mut self, rounds: u32) -> Result<()> {
        match &self.state {
            SessionState::Running { started_at, .. } => {
                let now = Utc::now();
                let duration_ms = (now - *started_at).num_milliseconds().max(0) as u64;
                self.state = SessionState::Completed {
                    completed_at: now,
                    duration_ms,
                    rounds,
                };
                self.updated_at = now;
                Ok(())
            }
            _ => Err(self.invalid("completed")),
        }
    }

    /// Transition: RUNNING → FAILED
    pub fn fail(&mut self, error: &OrchestratorError) -> Result<()> {
        match &self.state {
            SessionState::Running { .. } => {
                let now = Utc::now();
                self.state = SessionState::Failed {
                    failed_at: now,
                    error: error.to_string(),
                    error_category: error.category(),
                };
                self.updated_at = now;
                Ok(())
            }
            _ => Err(self.invalid("failed")),
        }
    }

    /// Transition: any non-terminal → ABANDONED
    pub fn abandon(&mut self, reason: &str) -> Result<()> {
        if self.state.is_terminal() {
            return Err(self.invalid("abandoned"));
        }

        let now = Utc::now();
        self.state = SessionState::Abandoned {
            abandoned_at: now,
            reason: reason.to_string(),
        };
        self.updated_at = now;
        Ok(())
    }
}

/// In-process session table
///
/// Each session sits behind its own async mutex: runs of one session are
/// serialized, runs of different sessions never wait on each other.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Mutex<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for `id`, registering a pending session on first use
    pub fn handle(&self, id: &str) -> Arc<Mutex<Session>> {
        self.sessions
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(id))))
            .value()
            .clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Copy of the session's current record
    pub async fn snapshot(&self, id: &str) -> Option<Session> {
        let handle = self.get(id)?;
        let session = handle.lock().await;
        Some(session.clone())
    }

    /// Drop `id` only while it still maps to `handle`
    pub fn evict(&self, id: &str, handle: &Arc<Mutex<Session>>) -> bool {
        self.sessions
            .remove_if(id, |_, current| Arc::ptr_eq(current, handle))
            .is_some()
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
