//! Error types for codereview-checkpoint

use std::fmt;
use thiserror::Error;

/// Checkpoint error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Backend failure (lock poisoning, connection loss, ...)
    Backend,
    /// A write would move a session backwards
    StaleWrite,
    /// Malformed record (empty session id, empty node pointer)
    InvalidRecord,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Backend => "backend",
            ErrorKind::StaleWrite => "stale_write",
            ErrorKind::InvalidRecord => "invalid_record",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Checkpoint error type
#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct CheckpointError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl CheckpointError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Backend, message)
    }

    pub fn stale_write(session_id: &str, stored: u64, attempted: u64) -> Self {
        Self::new(
            ErrorKind::StaleWrite,
            format!(
                "Session {} is at step {}, refusing write for step {}",
                session_id, stored, attempted
            ),
        )
    }

    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRecord, message)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CheckpointError>;
