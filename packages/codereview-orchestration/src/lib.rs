//! Code review orchestration
//!
//! An LLM-assisted review workflow built on a small state graph engine:
//!
//! ```text
//! code_input_node → analyze_code_node → human_feedback_node → final_report_node
//!                          ↑                    │
//!                          └─needs_improvement──┘
//! ```
//!
//! `analyze_code_node` runs a four-stage analysis sub-pipeline (syntax, best
//! practices, security, performance). The human decision loops the review back
//! until the findings are approved; every completed node is checkpointed per
//! session so a crashed or suspended review resumes instead of restarting.
//!
//! # Usage
//!
//! ```rust,ignore
//! let driver = ReviewDriver::new(&collaborators, &ReviewConfig::default())?;
//! match driver.review("session-1", ReviewRequest::new(code, "python")).await? {
//!     ReviewOutcome::Completed(report) => println!("{}", report.report),
//!     ReviewOutcome::AwaitingApproval { .. } => {
//!         driver.resume("session-1", json!({"approved": "yes"})).await?;
//!     }
//! }
//! ```

pub mod analysis_graph;
pub mod collaborators;
pub mod config;
pub mod driver;
pub mod error;
pub mod graph;
pub mod llm;
pub mod review_graph;
pub mod router;
pub mod session;
pub mod stages;
pub mod state;

pub use analysis_graph::{build_analysis_graph, AnalysisNode, AnalysisPipeline};
pub use collaborators::{
    AnalyzerSet, Approval, CodeAnalyzer, Collaborators, DecisionSource, ReportSynthesizer,
};
pub use config::{ConfigError, DecisionMode, ReviewConfig};
pub use driver::{ReviewDriver, ReviewOutcome, ReviewReport, ReviewRequest};
pub use error::{ErrorCategory, OrchestratorError, Result};
pub use graph::{
    CompiledGraph, Execution, FnStage, GraphState, Interrupt, NodeKey, Router, RunContext,
    Snapshot, Stage, StateGraph, Suspension, Target, END, START,
};
pub use llm::{LlmAnalyzer, LlmReportSynthesizer, OllamaClient, TextGenerator};
pub use review_graph::{build_review_graph, ReviewNode};
pub use router::FeedbackRouter;
pub use session::{Session, SessionRegistry, SessionState};
pub use state::{AnalysisState, Aspect, Findings, ReviewState, ReviewUpdate, Verdict};
