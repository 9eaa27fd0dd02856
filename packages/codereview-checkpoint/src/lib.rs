//! Checkpoint store for resumable review sessions
//!
//! A checkpoint is the latest `(node pointer, full state snapshot)` of one
//! session. The orchestration engine writes one after every completed node and
//! deletes it when the session reaches its terminal node, so a session that
//! stops midway (crash, external failure, waiting on a human) can be invoked
//! again with the same id and continue where it left off.
//!
//! ## Core Principles
//!
//! 1. **One record per session**: a put replaces the whole record
//! 2. **Atomic visibility**: readers never observe a half-written snapshot
//! 3. **Per-session isolation**: no global lock across sessions
//! 4. **Opaque state**: snapshots are bytes; encoding belongs to the engine
//!
//! ## Usage
//!
//! ```rust,ignore
//! use codereview_checkpoint::{CheckpointRecord, CheckpointStore, InMemoryCheckpointStore};
//!
//! let store = InMemoryCheckpointStore::new();
//! store.put(CheckpointRecord::new("session-1", "analyze_code_node", 2, bytes)).await?;
//! let latest = store.get("session-1").await?;
//! ```

pub mod domain;
pub mod error;

pub mod infrastructure;

pub use error::{CheckpointError, ErrorKind, Result};

pub use domain::{CheckpointRecord, CheckpointStore};

#[cfg(feature = "memory")]
pub use infrastructure::InMemoryCheckpointStore;
