use super::compiled::CompiledGraph;
use super::node::{GraphState, NodeKey, Router, Stage, Target};
use crate::error::{OrchestratorError, Result};
use codereview_checkpoint::CheckpointStore;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::warn;

/// Outgoing edge rule of a node
pub(crate) enum Edge<S, N> {
    Direct(Target<N>),
    Conditional {
        router: Arc<dyn Router<S>>,
        branches: HashMap<String, Target<N>>,
    },
}

impl<S, N: Copy> Edge<S, N> {
    fn targets(&self) -> Vec<Target<N>> {
        match self {
            Edge::Direct(target) => vec![*target],
            Edge::Conditional { branches, .. } => branches.values().copied().collect(),
        }
    }
}

/// Graph definition under construction
///
/// Registration problems (duplicate nodes or edges) are collected and
/// reported by `compile`, together with dangling edges, a missing entry point
/// and nodes without an exit.
pub struct StateGraph<S: GraphState, N: NodeKey> {
    name: &'static str,
    nodes: HashMap<N, Arc<dyn Stage<S>>>,
    order: Vec<N>,
    edges: HashMap<N, Edge<S, N>>,
    entry: Option<N>,
    problems: Vec<String>,
}

impl<S: GraphState, N: NodeKey> StateGraph<S, N> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            nodes: HashMap::new(),
            order: Vec::new(),
            edges: HashMap::new(),
            entry: None,
            problems: Vec::new(),
        }
    }

    pub fn add_node(&mut self, id: N, stage: impl Stage<S> + 'static) -> &mut Self {
        self.add_shared_node(id, Arc::new(stage))
    }

    pub fn add_shared_node(&mut self, id: N, stage: Arc<dyn Stage<S>>) -> &mut Self {
        if self.nodes.insert(id, stage).is_some() {
            self.problems
                .push(format!("node '{}' is registered more than once", id));
        } else {
            self.order.push(id);
        }
        self
    }

    pub fn set_entry_point(&mut self, id: N) -> &mut Self {
        if let Some(previous) = self.entry.replace(id) {
            if previous != id {
                self.problems.push(format!(
                    "entry point set twice ('{}' and '{}')",
                    previous, id
                ));
            }
        }
        self
    }

    /// Unconditional edge
    pub fn add_edge(&mut self, from: N, to: impl Into<Target<N>>) -> &mut Self {
        self.insert_edge(from, Edge::Direct(to.into()))
    }

    /// Router-selected edge: the router's label picks the branch
    pub fn add_conditional_edges<R, I, L>(&mut self, from: N, router: R, branches: I) -> &mut Self
    where
        R: Router<S> + 'static,
        I: IntoIterator<Item = (L, Target<N>)>,
        L: Into<String>,
    {
        let branches = branches
            .into_iter()
            .map(|(label, target)| (label.into(), target))
            .collect();
        self.insert_edge(
            from,
            Edge::Conditional {
                router: Arc::new(router),
                branches,
            },
        )
    }

    fn insert_edge(&mut self, from: N, edge: Edge<S, N>) -> &mut Self {
        if self.edges.insert(from, edge).is_some() {
            self.problems
                .push(format!("node '{}' has more than one outgoing edge rule", from));
        }
        self
    }

    /// Validate and freeze the definition (no checkpointing)
    pub fn compile(self) -> Result<CompiledGraph<S, N>> {
        let entry = self.validate()?;
        Ok(CompiledGraph::new(
            self.name,
            self.nodes,
            self.edges,
            entry,
            None,
        ))
    }

    /// Validate and freeze the definition, persisting a checkpoint after
    /// every completed node
    pub fn compile_with_checkpointer(
        self,
        checkpointer: Arc<dyn CheckpointStore>,
    ) -> Result<CompiledGraph<S, N>> {
        let entry = self.validate()?;
        Ok(CompiledGraph::new(
            self.name,
            self.nodes,
            self.edges,
            entry,
            Some(checkpointer),
        ))
    }

    fn validate(&self) -> Result<N> {
        if let Some(problem) = self.problems.first() {
            return Err(self.config_error(problem));
        }

        let entry = self
            .entry
            .ok_or_else(|| self.config_error("no entry point set"))?;
        if !self.nodes.contains_key(&entry) {
            return Err(self.config_error(format!(
                "entry point '{}' is not a registered node",
                entry
            )));
        }

        for (from, edge) in &self.edges {
            if !self.nodes.contains_key(from) {
                return Err(self.config_error(format!(
                    "edge leaves unregistered node '{}'",
                    from
                )));
            }
            if let Edge::Conditional { branches, .. } = edge {
                if branches.is_empty() {
                    return Err(self.config_error(format!(
                        "conditional edge of node '{}' has no branches",
                        from
                    )));
                }
            }
            for target in edge.targets() {
                if let Target::Node(to) = target {
                    if !self.nodes.contains_key(&to) {
                        return Err(self.config_error(format!(
                            "edge '{}' -> '{}' references an unregistered node",
                            from, to
                        )));
                    }
                }
            }
        }

        for node in &self.order {
            if !self.edges.contains_key(node) {
                return Err(self.config_error(format!(
                    "node '{}' has no outgoing edge and is not the terminal",
                    node
                )));
            }
        }

        for node in self.unreachable_from(entry) {
            warn!("Graph '{}': node '{}' is unreachable from the entry point", self.name, node);
        }

        Ok(entry)
    }

    fn unreachable_from(&self, entry: N) -> Vec<N> {
        let mut seen = HashSet::from([entry]);
        let mut queue = VecDeque::from([entry]);

        while let Some(node) = queue.pop_front() {
            if let Some(edge) = self.edges.get(&node) {
                for target in edge.targets() {
                    if let Target::Node(next) = target {
                        if seen.insert(next) {
                            queue.push_back(next);
                        }
                    }
                }
            }
        }

        self.order
            .iter()
            .filter(|node| !seen.contains(node))
            .copied()
            .collect()
    }

    fn config_error(&self, message: impl std::fmt::Display) -> OrchestratorError {
        OrchestratorError::configuration(format!("graph '{}': {}", self.name, message))
    }
}
