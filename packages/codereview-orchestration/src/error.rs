use crate::config::ConfigError;
use crate::graph::Interrupt;
use codereview_checkpoint::CheckpointError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Empty or missing code/language at entry
    #[error("Validation error: {0}")]
    Validation(String),

    /// Malformed graph definition, detected at build time
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Routing error (session '{session_id}'): {message}")]
    Routing { session_id: String, message: String },

    #[error("Precursor missing for node '{node}': {field} has not been produced")]
    PrecursorMissing { node: String, field: String },

    #[error("External call failed in node '{node}' (session '{session_id}'): {message}")]
    ExternalCallFailure {
        session_id: String,
        node: String,
        message: String,
    },

    /// Raised by a stage to suspend the session; the engine turns it into
    /// `Execution::Suspended` and never returns it to callers.
    #[error("Execution interrupted: {}", .0.reason)]
    Interrupted(Interrupt),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Bincode error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OrchestratorError {
    pub fn validation<E: std::fmt::Display>(e: E) -> Self {
        Self::Validation(e.to_string())
    }

    pub fn configuration<E: std::fmt::Display>(e: E) -> Self {
        Self::Configuration(e.to_string())
    }

    /// Routing failure; the engine fills in the session id
    pub fn routing<E: std::fmt::Display>(e: E) -> Self {
        Self::Routing {
            session_id: String::new(),
            message: e.to_string(),
        }
    }

    pub fn precursor_missing(node: impl Into<String>, field: impl Into<String>) -> Self {
        Self::PrecursorMissing {
            node: node.into(),
            field: field.into(),
        }
    }

    pub fn external(
        session_id: impl Into<String>,
        node: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::ExternalCallFailure {
            session_id: session_id.into(),
            node: node.into(),
            message: message.to_string(),
        }
    }

    /// Attach the session id to errors that report one
    pub fn in_session(self, id: &str) -> Self {
        match self {
            Self::Routing {
                session_id,
                message,
            } if session_id.is_empty() => Self::Routing {
                session_id: id.to_string(),
                message,
            },
            Self::ExternalCallFailure {
                session_id,
                node,
                message,
            } if session_id.is_empty() => Self::ExternalCallFailure {
                session_id: id.to_string(),
                node,
                message,
            },
            other => other,
        }
    }

    /// Session id carried by the error, if any
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Routing { session_id, .. } | Self::ExternalCallFailure { session_id, .. }
                if !session_id.is_empty() =>
            {
                Some(session_id)
            }
            Self::SessionNotFound(session_id) => Some(session_id),
            _ => None,
        }
    }

    /// Classify for retry decisions
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ExternalCallFailure { .. } | Self::Interrupted(_) => ErrorCategory::Transient,
            Self::Validation(_)
            | Self::Configuration(_)
            | Self::Routing { .. }
            | Self::PrecursorMissing { .. }
            | Self::SessionNotFound(_)
            | Self::InvalidStateTransition { .. }
            | Self::Config(_) => ErrorCategory::Permanent,
            Self::Checkpoint(_)
            | Self::Bincode(_)
            | Self::Io(_)
            | Self::Other(_) => ErrorCategory::Infrastructure,
        }
    }

    /// Re-invoking the same session may succeed
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }
}

/// Error category for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorCategory {
    /// Transient error - re-invoke the session (e.g., LLM timeout, connection)
    Transient,
    /// Permanent error - don't retry (e.g., invalid input, bad graph)
    Permanent,
    /// Infrastructure error - alert ops (e.g., checkpoint store down)
    Infrastructure,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
            ErrorCategory::Infrastructure => "infrastructure",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_session_fills_routing() {
        let err = OrchestratorError::routing("no edge for label 'maybe'").in_session("s-7");
        assert_eq!(err.session_id(), Some("s-7"));
        assert!(err.to_string().contains("s-7"));
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn test_in_session_keeps_existing_id() {
        let err = OrchestratorError::external("s-1", "syntax_check_node", "boom").in_session("s-2");
        assert_eq!(err.session_id(), Some("s-1"));
    }

    #[test]
    fn test_in_session_ignores_other_variants() {
        let err = OrchestratorError::validation("code is empty").in_session("s-1");
        assert!(matches!(err, OrchestratorError::Validation(_)));
        assert_eq!(err.session_id(), None);
    }

    #[test]
    fn test_categories() {
        assert!(OrchestratorError::external("s", "n", "timeout").is_retryable());
        assert_eq!(
            OrchestratorError::validation("empty").category(),
            ErrorCategory::Permanent
        );
        assert_eq!(
            OrchestratorError::routing("x").category(),
            ErrorCategory::Permanent
        );
        assert_eq!(
            OrchestratorError::precursor_missing("final_report_node", "security_issues")
                .category(),
            ErrorCategory::Permanent
        );
        assert_eq!(
            OrchestratorError::from(CheckpointError::backend("down")).category(),
            ErrorCategory::Infrastructure
        );
    }
}
