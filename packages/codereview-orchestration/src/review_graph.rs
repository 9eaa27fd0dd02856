//! Outer review graph
//!
//! ```text
//! code_input_node → analyze_code_node → human_feedback_node ─approved→ final_report_node → END
//!                          ↑                    │
//!                          └─needs_improvement──┘
//! ```

use crate::analysis_graph::AnalysisPipeline;
use crate::collaborators::Collaborators;
use crate::config::{DecisionMode, ReviewConfig};
use crate::error::{OrchestratorError, Result};
use crate::graph::{CompiledGraph, NodeKey, StateGraph, Target};
use crate::router::FeedbackRouter;
use crate::stages::{AnalyzeCodeStage, FinalReportStage, HumanFeedbackStage, ValidateInputStage};
use crate::state::ReviewState;
use codereview_checkpoint::CheckpointStore;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewNode {
    CodeInput,
    AnalyzeCode,
    HumanFeedback,
    FinalReport,
}

impl ReviewNode {
    pub const ALL: [ReviewNode; 4] = [
        ReviewNode::CodeInput,
        ReviewNode::AnalyzeCode,
        ReviewNode::HumanFeedback,
        ReviewNode::FinalReport,
    ];
}

impl NodeKey for ReviewNode {
    fn as_str(&self) -> &'static str {
        match self {
            ReviewNode::CodeInput => "code_input_node",
            ReviewNode::AnalyzeCode => "analyze_code_node",
            ReviewNode::HumanFeedback => "human_feedback_node",
            ReviewNode::FinalReport => "final_report_node",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|node| node.as_str() == name)
    }
}

impl fmt::Display for ReviewNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Wire the review graph from collaborators and configuration
///
/// Interactive decision mode needs `collaborators.decision`; interrupt mode
/// ignores it.
pub fn build_review_graph(
    collaborators: &Collaborators,
    config: &ReviewConfig,
    checkpointer: Option<Arc<dyn CheckpointStore>>,
) -> Result<CompiledGraph<ReviewState, ReviewNode>> {
    let pipeline = AnalysisPipeline::from_config(&collaborators.analyzers, &config.analysis)?;

    let affirmatives = config.decision.affirmatives.clone();
    let decision = match (config.decision.mode, &collaborators.decision) {
        (DecisionMode::Interrupt, _) => HumanFeedbackStage::suspending(affirmatives),
        (DecisionMode::Interactive, Some(source)) => {
            HumanFeedbackStage::interactive(source.clone(), affirmatives)
        }
        (DecisionMode::Interactive, None) => {
            return Err(OrchestratorError::configuration(
                "interactive decision mode needs a decision source",
            ))
        }
    };

    let report = FinalReportStage::new(collaborators.synthesizer.clone())
        .require_findings(config.report.require_findings);

    let mut graph = StateGraph::new("review");
    graph
        .add_node(ReviewNode::CodeInput, ValidateInputStage)
        .add_node(ReviewNode::AnalyzeCode, AnalyzeCodeStage::new(pipeline))
        .add_node(ReviewNode::HumanFeedback, decision)
        .add_node(ReviewNode::FinalReport, report)
        .set_entry_point(ReviewNode::CodeInput)
        .add_edge(ReviewNode::CodeInput, ReviewNode::AnalyzeCode)
        .add_edge(ReviewNode::AnalyzeCode, ReviewNode::HumanFeedback)
        .add_conditional_edges(
            ReviewNode::HumanFeedback,
            FeedbackRouter,
            [
                (FeedbackRouter::APPROVED, Target::Node(ReviewNode::FinalReport)),
                (
                    FeedbackRouter::NEEDS_IMPROVEMENT,
                    Target::Node(ReviewNode::AnalyzeCode),
                ),
            ],
        )
        .add_edge(ReviewNode::FinalReport, Target::End);

    match checkpointer {
        Some(store) => graph.compile_with_checkpointer(store),
        None => graph.compile(),
    }
}
