//! State graph engine
//!
//! Nodes are stages over a shared state; edges are either unconditional or
//! chosen by a router. A `StateGraph` is validated once by `compile` and the
//! resulting `CompiledGraph` executes sessions as an explicit loop over the
//! edge table, so cycles cost no stack depth and the position of a session is
//! a plain node name that can be checkpointed.
//!
//! ```rust,ignore
//! let mut graph = StateGraph::new("review");
//! graph
//!     .add_node(ReviewNode::AnalyzeCode, analyze)
//!     .add_node(ReviewNode::HumanFeedback, decide)
//!     .set_entry_point(ReviewNode::AnalyzeCode)
//!     .add_edge(ReviewNode::AnalyzeCode, ReviewNode::HumanFeedback)
//!     .add_conditional_edges(ReviewNode::HumanFeedback, router, branches);
//! let compiled = graph.compile_with_checkpointer(store)?;
//! let execution = compiled.invoke(initial_state, "session-1").await?;
//! ```

mod builder;
mod compiled;
mod interrupt;
mod node;

pub use builder::StateGraph;
pub use compiled::{CompiledGraph, Snapshot};
pub use interrupt::{Execution, Interrupt, Suspension};
pub use node::{FnStage, GraphState, NodeKey, Router, RunContext, Stage, Target};

/// Checkpoint node pointer meaning "nothing completed yet"
pub const START: &str = "__start__";

/// Name of the terminal marker
pub const END: &str = "__end__";
