use crate::collaborators::CodeAnalyzer;
use crate::error::{OrchestratorError, Result};
use crate::graph::{RunContext, Stage};
use crate::state::{AnalysisState, AnalysisUpdate, Aspect};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// One analysis node: asks a `CodeAnalyzer` about a single aspect
pub struct FindingStage {
    aspect: Aspect,
    analyzer: Arc<dyn CodeAnalyzer>,
    timeout: Option<Duration>,
}

impl FindingStage {
    pub fn new(aspect: Aspect, analyzer: Arc<dyn CodeAnalyzer>) -> Self {
        Self {
            aspect,
            analyzer,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn aspect(&self) -> Aspect {
        self.aspect
    }

    /// Run the analyzer once; failures, timeouts and blank answers are all
    /// `ExternalCallFailure`
    pub async fn analyze(
        &self,
        state: &AnalysisState,
        session_id: &str,
        node: &str,
    ) -> Result<AnalysisUpdate> {
        let start = Instant::now();
        let call = self.analyzer.analyze(&state.code, &state.language);

        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return Err(OrchestratorError::external(
                        session_id,
                        node,
                        format!(
                            "{} analysis timed out after {}ms",
                            self.aspect,
                            limit.as_millis()
                        ),
                    ))
                }
            },
            None => call.await,
        };

        let text = outcome.map_err(|e| {
            OrchestratorError::external(
                session_id,
                node,
                format!("{} analysis failed: {:#}", self.aspect, e),
            )
        })?;

        if text.trim().is_empty() {
            return Err(OrchestratorError::external(
                session_id,
                node,
                format!("{} analyzer returned no findings", self.aspect),
            ));
        }

        debug!(
            "{} analysis for session {} produced {} chars in {}ms",
            self.aspect,
            session_id,
            text.len(),
            start.elapsed().as_millis()
        );

        Ok(self.aspect.update(text))
    }
}

#[async_trait]
impl Stage<AnalysisState> for FindingStage {
    async fn run(&self, state: &AnalysisState, ctx: &RunContext) -> Result<AnalysisUpdate> {
        self.analyze(state, &ctx.session_id, ctx.node).await
    }
}
