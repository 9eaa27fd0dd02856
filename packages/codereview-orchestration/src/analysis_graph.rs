//! Analysis sub-pipeline
//!
//! syntax → best practices → security → performance, each node owning one
//! findings field of `AnalysisState`. The pipeline is a value: the composite
//! analyze stage of the review graph holds one and runs it on a fresh
//! projection every round.

use crate::collaborators::AnalyzerSet;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::graph::{CompiledGraph, GraphState, NodeKey, StateGraph, Target};
use crate::stages::FindingStage;
use crate::state::{AnalysisState, Aspect, Findings, ReviewState};
use futures::future::join_all;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisNode {
    SyntaxCheck,
    BestPractices,
    SecurityCheck,
    PerformanceReview,
}

impl AnalysisNode {
    /// Execution order of the sequential pipeline
    pub const ORDER: [AnalysisNode; 4] = [
        AnalysisNode::SyntaxCheck,
        AnalysisNode::BestPractices,
        AnalysisNode::SecurityCheck,
        AnalysisNode::PerformanceReview,
    ];

    pub fn for_aspect(aspect: Aspect) -> Self {
        match aspect {
            Aspect::Syntax => AnalysisNode::SyntaxCheck,
            Aspect::BestPractices => AnalysisNode::BestPractices,
            Aspect::Security => AnalysisNode::SecurityCheck,
            Aspect::Performance => AnalysisNode::PerformanceReview,
        }
    }

    pub fn aspect(&self) -> Aspect {
        match self {
            AnalysisNode::SyntaxCheck => Aspect::Syntax,
            AnalysisNode::BestPractices => Aspect::BestPractices,
            AnalysisNode::SecurityCheck => Aspect::Security,
            AnalysisNode::PerformanceReview => Aspect::Performance,
        }
    }
}

impl NodeKey for AnalysisNode {
    fn as_str(&self) -> &'static str {
        match self {
            AnalysisNode::SyntaxCheck => "syntax_check_node",
            AnalysisNode::BestPractices => "best_practices_node",
            AnalysisNode::SecurityCheck => "security_check_node",
            AnalysisNode::PerformanceReview => "performance_review_node",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ORDER.into_iter().find(|node| node.as_str() == name)
    }
}

impl fmt::Display for AnalysisNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn finding_stage(analyzers: &AnalyzerSet, aspect: Aspect, timeout: Option<Duration>) -> FindingStage {
    let analyzer = match aspect {
        Aspect::Syntax => analyzers.syntax.clone(),
        Aspect::BestPractices => analyzers.best_practices.clone(),
        Aspect::Security => analyzers.security.clone(),
        Aspect::Performance => analyzers.performance.clone(),
    };
    FindingStage::new(aspect, analyzer).with_timeout(timeout)
}

/// Linear four-node graph, no checkpointer
pub fn build_analysis_graph(
    analyzers: &AnalyzerSet,
    timeout: Option<Duration>,
) -> Result<CompiledGraph<AnalysisState, AnalysisNode>> {
    let mut graph = StateGraph::new("analysis");

    for node in AnalysisNode::ORDER {
        graph.add_node(node, finding_stage(analyzers, node.aspect(), timeout));
    }

    graph
        .set_entry_point(AnalysisNode::SyntaxCheck)
        .add_edge(AnalysisNode::SyntaxCheck, AnalysisNode::BestPractices)
        .add_edge(AnalysisNode::BestPractices, AnalysisNode::SecurityCheck)
        .add_edge(AnalysisNode::SecurityCheck, AnalysisNode::PerformanceReview)
        .add_edge(AnalysisNode::PerformanceReview, Target::End);

    graph.compile()
}

enum Mode {
    Sequential(CompiledGraph<AnalysisState, AnalysisNode>),
    Parallel(Vec<FindingStage>),
}

/// Runs the four analyses for one review round
pub struct AnalysisPipeline {
    mode: Mode,
}

impl AnalysisPipeline {
    pub fn sequential(analyzers: &AnalyzerSet, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            mode: Mode::Sequential(build_analysis_graph(analyzers, timeout)?),
        })
    }

    /// All four analyses in flight at once; updates are merged in pipeline
    /// order once every call has returned
    pub fn parallel(analyzers: &AnalyzerSet, timeout: Option<Duration>) -> Self {
        let stages = Aspect::ALL
            .into_iter()
            .map(|aspect| finding_stage(analyzers, aspect, timeout))
            .collect();
        Self {
            mode: Mode::Parallel(stages),
        }
    }

    pub fn from_config(analyzers: &AnalyzerSet, config: &AnalysisConfig) -> Result<Self> {
        if config.parallel {
            Ok(Self::parallel(analyzers, config.stage_timeout()))
        } else {
            Self::sequential(analyzers, config.stage_timeout())
        }
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self.mode, Mode::Parallel(_))
    }

    /// Project, analyze, and hand back the four findings
    pub async fn run(&self, review: &ReviewState, session_id: &str) -> Result<Findings> {
        let start = Instant::now();
        let mut state = AnalysisState::project(review);

        match &self.mode {
            Mode::Sequential(graph) => {
                state = graph.invoke(state, session_id).await?.into_state();
            }
            Mode::Parallel(stages) => {
                let snapshot = state.clone();
                let calls = stages.iter().map(|stage| {
                    let node = AnalysisNode::for_aspect(stage.aspect());
                    stage.analyze(&snapshot, session_id, node.as_str())
                });
                for update in join_all(calls).await {
                    state.apply(update?);
                }
            }
        }

        info!(
            "Analysis for session {} finished in {}ms ({})",
            session_id,
            start.elapsed().as_millis(),
            if self.is_parallel() { "parallel" } else { "sequential" }
        );
        debug!("Analysis findings for session {}: {:?}", session_id, state);

        Ok(state.into_findings())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::CodeAnalyzer;
    use crate::error::OrchestratorError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Records the order of calls across all four aspects
    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl CodeAnalyzer for Recorder {
        async fn analyze(&self, code: &str, _language: &str) -> anyhow::Result<String> {
            self.log.lock().unwrap().push(self.label);
            Ok(format!("{}: {}", self.label, code.len()))
        }
    }

    struct Counting(AtomicUsize);

    #[async_trait]
    impl CodeAnalyzer for Counting {
        async fn analyze(&self, _code: &str, _language: &str) -> anyhow::Result<String> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            Ok(format!("call {}", n))
        }
    }

    struct Failing;

    #[async_trait]
    impl CodeAnalyzer for Failing {
        async fn analyze(&self, _code: &str, _language: &str) -> anyhow::Result<String> {
            anyhow::bail!("model not loaded")
        }
    }

    fn recording() -> (AnalyzerSet, Arc<Mutex<Vec<&'static str>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let make = |label| -> Arc<dyn CodeAnalyzer> {
            Arc::new(Recorder {
                label,
                log: log.clone(),
            })
        };
        let set = AnalyzerSet {
            syntax: make("syntax"),
            best_practices: make("best_practices"),
            security: make("security"),
            performance: make("performance"),
        };
        (set, log)
    }

    #[test]
    fn test_node_names_roundtrip() {
        for node in AnalysisNode::ORDER {
            assert_eq!(AnalysisNode::from_name(node.as_str()), Some(node));
            assert_eq!(AnalysisNode::for_aspect(node.aspect()), node);
        }
        assert_eq!(AnalysisNode::from_name("Analyze_code_node"), None);
    }

    #[tokio::test]
    async fn test_sequential_order_and_findings() {
        let (analyzers, log) = recording();
        let pipeline = AnalysisPipeline::sequential(&analyzers, None).unwrap();

        let review = ReviewState::new("print(1)", "python");
        let findings = pipeline.run(&review, "s-1").await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["syntax", "best_practices", "security", "performance"]
        );
        assert_eq!(findings.syntax.as_deref(), Some("syntax: 8"));
        assert_eq!(findings.performance.as_deref(), Some("performance: 8"));
        assert!(findings.is_complete());
    }

    #[tokio::test]
    async fn test_parallel_produces_all_findings() {
        let (analyzers, log) = recording();
        let pipeline = AnalysisPipeline::parallel(&analyzers, None);
        assert!(pipeline.is_parallel());

        let findings = pipeline
            .run(&ReviewState::new("x", "rust"), "s-1")
            .await
            .unwrap();

        assert_eq!(log.lock().unwrap().len(), 4);
        assert_eq!(findings.security.as_deref(), Some("security: 1"));
        assert!(findings.is_complete());
    }

    #[tokio::test]
    async fn test_each_run_starts_from_fresh_projection() {
        let counter = Arc::new(Counting(AtomicUsize::new(0)));
        let analyzers = AnalyzerSet::uniform(counter.clone());
        let pipeline = AnalysisPipeline::sequential(&analyzers, None).unwrap();

        let mut review = ReviewState::new("x = 1", "python");
        review.syntax_issues = Some("stale".to_string());

        let first = pipeline.run(&review, "s-1").await.unwrap();
        let second = pipeline.run(&review, "s-1").await.unwrap();

        assert_eq!(first.syntax.as_deref(), Some("call 0"));
        assert_eq!(second.syntax.as_deref(), Some("call 4"));
        assert_eq!(counter.0.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn test_failure_stops_sequential_pipeline() {
        let (mut analyzers, log) = recording();
        analyzers.security = Arc::new(Failing);
        let pipeline = AnalysisPipeline::sequential(&analyzers, None).unwrap();

        let err = pipeline
            .run(&ReviewState::new("x", "python"), "s-3")
            .await
            .unwrap_err();

        assert_eq!(*log.lock().unwrap(), vec!["syntax", "best_practices"]);
        match err {
            OrchestratorError::ExternalCallFailure {
                session_id, node, ..
            } => {
                assert_eq!(session_id, "s-3");
                assert_eq!(node, "security_check_node");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failure_in_parallel_mode_names_node() {
        let (mut analyzers, _log) = recording();
        analyzers.performance = Arc::new(Failing);
        let pipeline = AnalysisPipeline::from_config(
            &analyzers,
            &AnalysisConfig {
                parallel: true,
                stage_timeout_ms: None,
            },
        )
        .unwrap();

        let err = pipeline
            .run(&ReviewState::new("x", "python"), "s-4")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("performance_review_node"));
    }
}
