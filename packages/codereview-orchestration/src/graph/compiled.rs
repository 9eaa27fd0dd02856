use super::builder::Edge;
use super::interrupt::{Execution, Suspension};
use super::node::{GraphState, NodeKey, RunContext, Stage, Target};
use super::START;
use crate::error::{OrchestratorError, Result};
use codereview_checkpoint::{CheckpointRecord, CheckpointStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Persisted position of a session, decoded
#[derive(Debug, Clone)]
pub struct Snapshot<S> {
    /// Last completed node (or `START` when nothing completed yet)
    pub node: String,
    pub step: u64,
    pub state: S,
}

/// Immutable, validated graph definition plus the executor loop
///
/// Holds no per-run data: everything a run mutates lives in the state value
/// and in the checkpoint store, so one instance serves concurrent sessions.
pub struct CompiledGraph<S: GraphState, N: NodeKey> {
    name: &'static str,
    nodes: HashMap<N, Arc<dyn Stage<S>>>,
    edges: HashMap<N, Edge<S, N>>,
    entry: N,
    checkpointer: Option<Arc<dyn CheckpointStore>>,
}

/// Where a run starts
struct Cursor<S, N> {
    state: S,
    next: Target<N>,
    step: u64,
    persisted: bool,
}

impl<S: GraphState, N: NodeKey> CompiledGraph<S, N> {
    pub(crate) fn new(
        name: &'static str,
        nodes: HashMap<N, Arc<dyn Stage<S>>>,
        edges: HashMap<N, Edge<S, N>>,
        entry: N,
        checkpointer: Option<Arc<dyn CheckpointStore>>,
    ) -> Self {
        Self {
            name,
            nodes,
            edges,
            entry,
            checkpointer,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn entry(&self) -> N {
        self.entry
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_checkpointed(&self) -> bool {
        self.checkpointer.is_some()
    }

    /// Run a session to completion or suspension
    ///
    /// When the session already has a checkpoint, execution continues from it
    /// and `initial` is ignored.
    pub async fn invoke(&self, initial: S, session_id: &str) -> Result<Execution<S, N>> {
        let cursor = match self.restore(session_id).await? {
            Some(cursor) => {
                info!(
                    "Graph '{}': resuming session {} at step {} (next: {})",
                    self.name, session_id, cursor.step, cursor.next
                );
                cursor
            }
            None => Cursor {
                state: initial,
                next: Target::Node(self.entry),
                step: 0,
                persisted: false,
            },
        };

        self.run(cursor, session_id, None).await
    }

    /// Continue a suspended session, handing `value` to the node that
    /// suspended it
    pub async fn resume(&self, session_id: &str, value: serde_json::Value) -> Result<Execution<S, N>> {
        let cursor = self
            .restore(session_id)
            .await?
            .ok_or_else(|| OrchestratorError::SessionNotFound(session_id.to_string()))?;

        info!(
            "Graph '{}': resuming session {} with external input at {}",
            self.name, session_id, cursor.next
        );

        self.run(cursor, session_id, Some(value)).await
    }

    /// Decoded checkpoint of a session, if any
    pub async fn snapshot(&self, session_id: &str) -> Result<Option<Snapshot<S>>> {
        let store = match &self.checkpointer {
            Some(store) => store,
            None => return Ok(None),
        };

        match store.get(session_id).await? {
            Some(record) => Ok(Some(Snapshot {
                state: bincode::deserialize(&record.state)?,
                node: record.node,
                step: record.step,
            })),
            None => Ok(None),
        }
    }

    async fn run(
        &self,
        cursor: Cursor<S, N>,
        session_id: &str,
        mut resume: Option<serde_json::Value>,
    ) -> Result<Execution<S, N>> {
        let start_time = Instant::now();
        let Cursor {
            mut state,
            mut next,
            mut step,
            mut persisted,
        } = cursor;

        loop {
            let node = match next {
                Target::Node(node) => node,
                Target::End => {
                    self.clear(session_id).await?;
                    info!(
                        "Graph '{}': session {} completed after {} steps in {}ms",
                        self.name,
                        session_id,
                        step,
                        start_time.elapsed().as_millis()
                    );
                    return Ok(Execution::Completed(state));
                }
            };

            let stage = self.nodes.get(&node).ok_or_else(|| {
                OrchestratorError::configuration(format!(
                    "graph '{}': no stage registered for node '{}'",
                    self.name, node
                ))
            })?;

            let ctx = RunContext {
                session_id: session_id.to_string(),
                node: node.as_str(),
                step,
                resume: resume.take(),
            };

            debug!("Graph '{}': session {} running {}", self.name, session_id, node);
            let node_start = Instant::now();

            let update = match stage.run(&state, &ctx).await {
                Ok(update) => update,
                Err(OrchestratorError::Interrupted(interrupt)) => {
                    if !persisted {
                        self.save(session_id, START, &state, step).await?;
                    }
                    info!(
                        "Graph '{}': session {} suspended at {}: {}",
                        self.name, session_id, node, interrupt.reason
                    );
                    return Ok(Execution::Suspended(Suspension {
                        session_id: session_id.to_string(),
                        node,
                        interrupt,
                        state,
                    }));
                }
                Err(e) => {
                    error!(
                        "Graph '{}': session {} failed at {}: {}",
                        self.name, session_id, node, e
                    );
                    return Err(e.in_session(session_id));
                }
            };

            state.apply(update);
            step += 1;
            self.save(session_id, node.as_str(), &state, step).await?;
            persisted = persisted || self.checkpointer.is_some();

            debug!(
                "Graph '{}': session {} completed {} in {}ms",
                self.name,
                session_id,
                node,
                node_start.elapsed().as_millis()
            );

            next = self.next_target(node, &state).map_err(|e| {
                error!(
                    "Graph '{}': session {} could not route from {}: {}",
                    self.name, session_id, node, e
                );
                e.in_session(session_id)
            })?;
        }
    }

    fn next_target(&self, node: N, state: &S) -> Result<Target<N>> {
        match self.edges.get(&node) {
            Some(Edge::Direct(target)) => Ok(*target),
            Some(Edge::Conditional { router, branches }) => {
                let label = router.route(state)?;
                branches.get(&label).copied().ok_or_else(|| {
                    OrchestratorError::routing(format!(
                        "router of node '{}' returned label '{}' with no matching edge",
                        node, label
                    ))
                })
            }
            None => Err(OrchestratorError::configuration(format!(
                "graph '{}': node '{}' has no outgoing edge",
                self.name, node
            ))),
        }
    }

    async fn restore(&self, session_id: &str) -> Result<Option<Cursor<S, N>>> {
        let snapshot = match self.snapshot(session_id).await? {
            Some(snapshot) => snapshot,
            None => return Ok(None),
        };

        let next = if snapshot.node == START {
            Target::Node(self.entry)
        } else {
            let node = N::from_name(&snapshot.node).ok_or_else(|| {
                OrchestratorError::configuration(format!(
                    "graph '{}': checkpoint of session {} points at unknown node '{}'",
                    self.name, session_id, snapshot.node
                ))
            })?;
            self.next_target(node, &snapshot.state)
                .map_err(|e| e.in_session(session_id))?
        };

        Ok(Some(Cursor {
            state: snapshot.state,
            next,
            step: snapshot.step,
            persisted: true,
        }))
    }

    async fn save(&self, session_id: &str, node: &str, state: &S, step: u64) -> Result<()> {
        if let Some(store) = &self.checkpointer {
            let bytes = bincode::serialize(state)?;
            store
                .put(CheckpointRecord::new(session_id, node, step, bytes))
                .await?;
            debug!(
                "Graph '{}': checkpoint saved for session {} after {} (step {})",
                self.name, session_id, node, step
            );
        }
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<()> {
        if let Some(store) = &self.checkpointer {
            if !store.delete(session_id).await? {
                warn!(
                    "Graph '{}': session {} finished without a checkpoint to clear",
                    self.name, session_id
                );
            }
        }
        Ok(())
    }
}
