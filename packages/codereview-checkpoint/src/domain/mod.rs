//! Domain layer for the checkpoint store
//!
//! # Domain Models
//!
//! - `CheckpointRecord`: latest snapshot of one session (node pointer + state)
//!
//! # Port Trait
//!
//! - `CheckpointStore`: put / get / delete keyed by session id
//!
//! # Examples
//!
//! ```rust,ignore
//! use codereview_checkpoint::{CheckpointRecord, CheckpointStore};
//!
//! async fn example(store: impl CheckpointStore) -> Result<()> {
//!     let record = CheckpointRecord::new("session-1", "analyze_code_node", 2, snapshot);
//!     store.put(record).await?;
//!
//!     if let Some(latest) = store.get("session-1").await? {
//!         println!("resume after {}", latest.node);
//!     }
//!
//!     store.delete("session-1").await?;
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CheckpointError, Result};

// ═══════════════════════════════════════════════════════════════════════════
// Domain Models
// ═══════════════════════════════════════════════════════════════════════════

/// Latest persisted position of a session
///
/// A session owns at most one record. Every `put` replaces the whole record,
/// so a reader sees either the previous snapshot or the new one, never a mix.
///
/// # Examples
///
/// ```rust
/// use codereview_checkpoint::CheckpointRecord;
///
/// let record = CheckpointRecord::new("session-1", "human_feedback_node", 3, vec![1, 2, 3]);
/// assert_eq!(record.session_id, "session-1");
/// assert_eq!(record.step, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// Session identifier (stable across resumptions)
    pub session_id: String,
    /// Name of the last node whose update is contained in `state`
    pub node: String,
    /// Number of nodes completed in this session so far
    pub step: u64,
    /// Serialized full state snapshot
    pub state: Vec<u8>,
    /// Write timestamp
    pub written_at: DateTime<Utc>,
}

impl CheckpointRecord {
    pub fn new(
        session_id: impl Into<String>,
        node: impl Into<String>,
        step: u64,
        state: Vec<u8>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            node: node.into(),
            step,
            state,
            written_at: Utc::now(),
        }
    }

    /// Reject records no store should accept
    pub fn validate(&self) -> Result<()> {
        if self.session_id.trim().is_empty() {
            return Err(CheckpointError::invalid_record("session id is empty"));
        }
        if self.node.trim().is_empty() {
            return Err(CheckpointError::invalid_record(format!(
                "node pointer is empty for session {}",
                self.session_id
            )));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Port Trait
// ═══════════════════════════════════════════════════════════════════════════

/// Checkpoint store keyed by session id
///
/// Implementations must make a single `put` atomic with respect to `get`, and
/// must not serialize unrelated sessions behind one lock.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Replace the session's record
    ///
    /// Fails with `StaleWrite` when `record.step` is behind the stored record.
    async fn put(&self, record: CheckpointRecord) -> Result<()>;

    /// Latest record for the session, if any
    async fn get(&self, session_id: &str) -> Result<Option<CheckpointRecord>>;

    /// Remove the session's record; returns whether one existed
    async fn delete(&self, session_id: &str) -> Result<bool>;

    /// Sessions that currently hold a checkpoint
    async fn sessions(&self) -> Result<Vec<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_record_new() {
        let record = CheckpointRecord::new("s1", "validate", 1, vec![9]);
        assert_eq!(record.session_id, "s1");
        assert_eq!(record.node, "validate");
        assert_eq!(record.step, 1);
        assert_eq!(record.state, vec![9]);
    }

    #[test]
    fn test_record_validate_empty_session() {
        let record = CheckpointRecord::new("  ", "validate", 1, vec![]);
        let err = record.validate().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRecord);
    }

    #[test]
    fn test_record_validate_empty_node() {
        let record = CheckpointRecord::new("s1", "", 1, vec![]);
        let err = record.validate().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidRecord);
        assert!(err.message.contains("s1"));
    }

    #[test]
    fn test_record_serde_json() {
        let record = CheckpointRecord::new("s1", "analyze", 2, vec![1, 2]);
        let json = serde_json::to_string(&record).unwrap();
        let back: CheckpointRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
