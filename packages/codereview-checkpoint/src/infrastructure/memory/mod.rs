//! In-memory checkpoint store
//!
//! Process-wide store backed by a sharded `DashMap`: a put locks only the
//! shard holding the session, so unrelated reviews never wait on each other.
//! Records do not survive a process restart.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::{CheckpointRecord, CheckpointStore};
use crate::{CheckpointError, Result};

#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    records: DashMap<String, CheckpointRecord>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions holding a checkpoint
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn put(&self, record: CheckpointRecord) -> Result<()> {
        record.validate()?;

        match self.records.entry(record.session_id.clone()) {
            Entry::Occupied(mut existing) => {
                let stored = existing.get().step;
                if record.step < stored {
                    return Err(CheckpointError::stale_write(
                        &record.session_id,
                        stored,
                        record.step,
                    ));
                }
                existing.insert(record);
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<CheckpointRecord>> {
        Ok(self.records.get(session_id).map(|r| r.value().clone()))
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        Ok(self.records.remove(session_id).is_some())
    }

    async fn sessions(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.records.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}
