use crate::collaborators::ReportSynthesizer;
use crate::error::{OrchestratorError, Result};
use crate::graph::{RunContext, Stage};
use crate::state::{ReviewState, ReviewUpdate, Verdict};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Final node: synthesizes the report from the approved findings
pub struct FinalReportStage {
    synthesizer: Arc<dyn ReportSynthesizer>,
    require_findings: bool,
}

impl FinalReportStage {
    pub fn new(synthesizer: Arc<dyn ReportSynthesizer>) -> Self {
        Self {
            synthesizer,
            require_findings: true,
        }
    }

    /// When off, blank findings are passed through to the synthesizer
    pub fn require_findings(mut self, required: bool) -> Self {
        self.require_findings = required;
        self
    }
}

#[async_trait]
impl Stage<ReviewState> for FinalReportStage {
    async fn run(&self, state: &ReviewState, ctx: &RunContext) -> Result<ReviewUpdate> {
        if state.human_feedback != Some(Verdict::Approved) {
            return Err(OrchestratorError::precursor_missing(ctx.node, "human_feedback"));
        }

        let findings = state.findings();
        if let Some(field) = findings.first_missing() {
            if self.require_findings {
                return Err(OrchestratorError::precursor_missing(ctx.node, field));
            }
            warn!(
                "Session {}: synthesizing report without {}",
                ctx.session_id, field
            );
        }

        let start = Instant::now();
        let report = self
            .synthesizer
            .synthesize(&state.language, &findings)
            .await
            .map_err(|e| {
                OrchestratorError::external(
                    ctx.session_id.as_str(),
                    ctx.node,
                    format!("report synthesis failed: {:#}", e),
                )
            })?;

        if report.trim().is_empty() {
            return Err(OrchestratorError::external(
                ctx.session_id.as_str(),
                ctx.node,
                "report synthesizer returned an empty report",
            ));
        }

        info!(
            "Session {}: report synthesized ({} chars, {}ms)",
            ctx.session_id,
            report.len(),
            start.elapsed().as_millis()
        );

        Ok(ReviewUpdate {
            final_report: Some(report),
            ..Default::default()
        })
    }
}
