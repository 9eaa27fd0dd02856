use serde::{Deserialize, Serialize};

/// Suspension request raised by a stage that needs outside input
///
/// The stage returns `OrchestratorError::Interrupted(interrupt)`; the caller
/// receives the interrupt in `Execution::Suspended` and later resumes the
/// session with a JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interrupt {
    /// What kind of input is being asked for
    #[serde(rename = "type")]
    pub kind: String,
    pub reason: String,
    /// Data the responder needs to decide
    #[serde(default)]
    pub payload: serde_json::Value,
    /// How to answer
    pub instructions: String,
}

impl Interrupt {
    pub fn new(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            reason: reason.into(),
            payload: serde_json::Value::Null,
            instructions: String::new(),
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }
}

/// Result of running a graph for one session
#[derive(Debug, Clone)]
pub enum Execution<S, N> {
    /// Reached the terminal node; the session's checkpoint is gone
    Completed(S),
    /// A stage asked for outside input; the checkpoint is kept for resume
    Suspended(Suspension<S, N>),
}

impl<S, N> Execution<S, N> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Execution::Completed(_))
    }

    pub fn state(&self) -> &S {
        match self {
            Execution::Completed(state) => state,
            Execution::Suspended(suspension) => &suspension.state,
        }
    }

    pub fn into_state(self) -> S {
        match self {
            Execution::Completed(state) => state,
            Execution::Suspended(suspension) => suspension.state,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Suspension<S, N> {
    pub session_id: String,
    /// Node that will be re-entered on resume
    pub node: N,
    pub interrupt: Interrupt,
    /// State as of the last completed node
    pub state: S,
}
