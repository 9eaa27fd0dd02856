use crate::analysis_graph::AnalysisPipeline;
use crate::error::Result;
use crate::graph::{RunContext, Stage};
use crate::state::{ReviewState, ReviewUpdate};
use async_trait::async_trait;
use tracing::info;

/// Composite node: one full run of the analysis sub-pipeline
///
/// Overwrites all four findings and bumps `analysis_rounds`. Nothing inside
/// the sub-pipeline is checkpointed; an interrupted round is redone whole.
pub struct AnalyzeCodeStage {
    pipeline: AnalysisPipeline,
}

impl AnalyzeCodeStage {
    pub fn new(pipeline: AnalysisPipeline) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Stage<ReviewState> for AnalyzeCodeStage {
    async fn run(&self, state: &ReviewState, ctx: &RunContext) -> Result<ReviewUpdate> {
        let round = state.analysis_rounds + 1;
        info!(
            "Session {}: analysis round {} for {} code",
            ctx.session_id, round, state.language
        );

        let findings = self.pipeline.run(state, &ctx.session_id).await?;

        let mut update = ReviewUpdate::from_findings(findings);
        update.analysis_rounds = Some(round);
        Ok(update)
    }
}
