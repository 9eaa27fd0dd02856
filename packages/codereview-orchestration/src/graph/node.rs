use crate::error::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::hash::Hash;

/// Node identifier of a graph (a bounded enum per graph)
///
/// `as_str` is the name written into checkpoints; `from_name` must accept
/// every name `as_str` produces.
pub trait NodeKey: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {
    fn as_str(&self) -> &'static str;

    fn from_name(name: &str) -> Option<Self>;
}

/// State threaded through every node of a graph
pub trait GraphState: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Partial update returned by a stage
    type Update: Send + 'static;

    /// Merge an update: present fields overwrite, absent fields stay, nothing
    /// is ever removed.
    fn apply(&mut self, update: Self::Update);
}

/// Per-invocation context handed to a stage
#[derive(Debug, Clone)]
pub struct RunContext {
    pub session_id: String,
    pub node: &'static str,
    /// Nodes completed in this session before this one
    pub step: u64,
    /// Value supplied by `CompiledGraph::resume`, only for the node that
    /// suspended the session
    pub resume: Option<serde_json::Value>,
}

impl RunContext {
    pub fn new(session_id: impl Into<String>, node: &'static str) -> Self {
        Self {
            session_id: session_id.into(),
            node,
            step: 0,
            resume: None,
        }
    }
}

/// Unit of work executed when a node runs
#[async_trait]
pub trait Stage<S: GraphState>: Send + Sync {
    async fn run(&self, state: &S, ctx: &RunContext) -> Result<S::Update>;
}

/// Adapts a plain function into a stage
pub struct FnStage<F>(pub F);

#[async_trait]
impl<S, F> Stage<S> for FnStage<F>
where
    S: GraphState,
    F: Fn(&S) -> Result<S::Update> + Send + Sync,
{
    async fn run(&self, state: &S, _ctx: &RunContext) -> Result<S::Update> {
        (self.0)(state)
    }
}

/// Selects an outgoing edge label from the merged state
pub trait Router<S>: Send + Sync {
    fn route(&self, state: &S) -> Result<String>;
}

impl<S, F> Router<S> for F
where
    F: Fn(&S) -> Result<String> + Send + Sync,
{
    fn route(&self, state: &S) -> Result<String> {
        self(state)
    }
}

/// Edge destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target<N> {
    Node(N),
    /// Terminal marker
    End,
}

impl<N: NodeKey> fmt::Display for Target<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Node(node) => write!(f, "{}", node.as_str()),
            Target::End => write!(f, "{}", super::END),
        }
    }
}

impl<N> From<N> for Target<N> {
    fn from(node: N) -> Self {
        Target::Node(node)
    }
}
