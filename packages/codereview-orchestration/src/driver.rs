//! Review driver
//!
//! Seeds a session, runs the review graph to completion or to the approval
//! suspension point, and keeps the session table in step with what the graph
//! did. This is the API the CLI and any embedding service use.

use crate::collaborators::Collaborators;
use crate::config::ReviewConfig;
use crate::error::{OrchestratorError, Result};
use crate::graph::{CompiledGraph, Execution, Interrupt, NodeKey, Snapshot};
use crate::review_graph::{build_review_graph, ReviewNode};
use crate::session::{Session, SessionRegistry, SessionState};
use crate::stages::ValidateInputStage;
use crate::state::{Findings, ReviewState};
use codereview_checkpoint::{CheckpointStore, InMemoryCheckpointStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Code submitted for review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub code: String,
    pub language: String,
}

impl ReviewRequest {
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        ValidateInputStage::check(&self.code, &self.language)
    }
}

/// Terminal output of an approved review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewReport {
    pub session_id: String,
    pub language: String,
    pub report: String,
    /// Analysis rounds it took to get approval
    pub rounds: u32,
    pub findings: Findings,
}

#[derive(Debug, Clone)]
pub enum ReviewOutcome {
    Completed(ReviewReport),
    /// Suspended at the decision node; answer with `ReviewDriver::resume`
    AwaitingApproval {
        session_id: String,
        interrupt: Interrupt,
        state: ReviewState,
    },
}

impl ReviewOutcome {
    pub fn report(&self) -> Option<&ReviewReport> {
        match self {
            ReviewOutcome::Completed(report) => Some(report),
            ReviewOutcome::AwaitingApproval { .. } => None,
        }
    }

    pub fn is_awaiting_approval(&self) -> bool {
        matches!(self, ReviewOutcome::AwaitingApproval { .. })
    }
}

pub struct ReviewDriver {
    graph: CompiledGraph<ReviewState, ReviewNode>,
    store: Arc<dyn CheckpointStore>,
    sessions: SessionRegistry,
}

impl ReviewDriver {
    /// Driver over an in-memory checkpoint store
    pub fn new(collaborators: &Collaborators, config: &ReviewConfig) -> Result<Self> {
        Self::with_store(collaborators, config, Arc::new(InMemoryCheckpointStore::new()))
    }

    pub fn with_store(
        collaborators: &Collaborators,
        config: &ReviewConfig,
        store: Arc<dyn CheckpointStore>,
    ) -> Result<Self> {
        config.validate()?;
        let graph = build_review_graph(collaborators, config, Some(store.clone()))?;
        Ok(Self {
            graph,
            store,
            sessions: SessionRegistry::new(),
        })
    }

    pub fn graph(&self) -> &CompiledGraph<ReviewState, ReviewNode> {
        &self.graph
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Run a review for `session_id`
    ///
    /// Invalid requests are rejected before anything runs. If the session
    /// already has a checkpoint (a failed or suspended earlier run), the run
    /// continues from it and `request` is not used; abandon the session to
    /// start over.
    pub async fn review(&self, session_id: &str, request: ReviewRequest) -> Result<ReviewOutcome> {
        request.validate()?;

        let handle = self.sessions.handle(session_id);
        let mut session = handle.lock().await;
        if matches!(session.state, SessionState::Abandoned { .. }) {
            *session = Session::new(session_id);
        }
        session.start()?;
        session.language = Some(request.language.clone());

        info!(
            "Session {}: review started (attempt {})",
            session_id, session.attempts
        );

        let initial = ReviewState::new(request.code, request.language);
        let result = self.graph.invoke(initial, session_id).await;
        let outcome = Self::settle(&mut session, result);
        self.release(&handle, &session);
        outcome
    }

    /// Answer a suspended session and continue it
    pub async fn resume(&self, session_id: &str, value: serde_json::Value) -> Result<ReviewOutcome> {
        let handle = self.sessions.handle(session_id);
        let mut session = handle.lock().await;

        // Checked under the lock: a concurrent run may have just finished
        if self.store.get(session_id).await?.is_none() {
            self.release(&handle, &session);
            return Err(OrchestratorError::SessionNotFound(session_id.to_string()));
        }
        session.start()?;

        info!("Session {}: resumed with {}", session_id, value);

        let result = self.graph.resume(session_id, value).await;
        let outcome = Self::settle(&mut session, result);
        self.release(&handle, &session);
        outcome
    }

    /// Give up on a session and delete its checkpoint
    ///
    /// Returns whether a checkpoint was deleted.
    pub async fn abandon(&self, session_id: &str, reason: &str) -> Result<bool> {
        let has_checkpoint = self.store.get(session_id).await?.is_some();
        if !has_checkpoint && self.sessions.get(session_id).is_none() {
            return Err(OrchestratorError::SessionNotFound(session_id.to_string()));
        }

        let handle = self.sessions.handle(session_id);
        let mut session = handle.lock().await;
        session.abandon(reason)?;
        let deleted = self.store.delete(session_id).await?;

        info!("Session {}: abandoned ({})", session_id, reason);
        Ok(deleted)
    }

    /// Persisted position of a session, for diagnosis
    pub async fn checkpoint(&self, session_id: &str) -> Result<Option<Snapshot<ReviewState>>> {
        self.graph.snapshot(session_id).await
    }

    /// Current record of a session that has not completed yet
    ///
    /// Completed sessions are dropped from the table once their report is
    /// returned.
    pub async fn session(&self, session_id: &str) -> Option<Session> {
        self.sessions.snapshot(session_id).await
    }

    /// Drop a session record that no longer has work attached
    ///
    /// Running sessions and sessions with a checkpoint are kept; abandon
    /// them first. Returns whether an entry was removed.
    pub async fn forget(&self, session_id: &str) -> Result<bool> {
        let Some(handle) = self.sessions.get(session_id) else {
            return Ok(false);
        };
        let session = handle.lock().await;
        if matches!(session.state, SessionState::Running { .. })
            || self.store.get(session_id).await?.is_some()
        {
            return Err(OrchestratorError::InvalidStateTransition {
                from: session.state.state_name().to_string(),
                to: "forgotten".to_string(),
            });
        }
        Ok(self.sessions.evict(session_id, &handle))
    }

    /// Evict completed sessions, and entries a lookup registered but never ran
    fn release(&self, handle: &Arc<Mutex<Session>>, session: &Session) {
        if matches!(
            session.state,
            SessionState::Completed { .. } | SessionState::Pending { .. }
        ) && self.sessions.evict(&session.id, handle)
        {
            debug!("Session {}: released ({})", session.id, session.state.state_name());
        }
    }

    fn settle(
        session: &mut Session,
        result: Result<Execution<ReviewState, ReviewNode>>,
    ) -> Result<ReviewOutcome> {
        match result {
            Ok(Execution::Completed(state)) => {
                let report = match state.final_report.clone() {
                    Some(report) => report,
                    None => {
                        let missing = OrchestratorError::precursor_missing(
                            ReviewNode::FinalReport.as_str(),
                            "final_report",
                        );
                        return Self::settle(session, Err(missing));
                    }
                };
                session.complete(state.analysis_rounds)?;
                info!(
                    "Session {}: review completed after {} round(s)",
                    session.id, state.analysis_rounds
                );
                Ok(ReviewOutcome::Completed(ReviewReport {
                    session_id: session.id.clone(),
                    findings: state.findings(),
                    language: state.language,
                    report,
                    rounds: state.analysis_rounds,
                }))
            }
            Ok(Execution::Suspended(suspension)) => {
                session.suspend(suspension.node.as_str(), &suspension.interrupt.reason)?;
                Ok(ReviewOutcome::AwaitingApproval {
                    session_id: suspension.session_id,
                    interrupt: suspension.interrupt,
                    state: suspension.state,
                })
            }
            Err(e) => {
                if let Err(transition) = session.fail(&e) {
                    warn!("Session {}: {}", session.id, transition);
                }
                warn!(
                    "Session {}: review failed ({}): {}",
                    session.id,
                    e.category(),
                    e
                );
                Err(e)
            }
        }
    }
}
