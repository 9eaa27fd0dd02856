use crate::collaborators::{Approval, DecisionSource};
use crate::error::{OrchestratorError, Result};
use crate::graph::{Interrupt, RunContext, Stage};
use crate::state::{ReviewState, ReviewUpdate};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Interrupt kind raised by the decision stage
pub const APPROVAL_REQUEST: &str = "code review approval";

enum Input {
    Source(Arc<dyn DecisionSource>),
    Suspend,
}

/// Decision node: turns a human answer into a verdict
///
/// Interactive mode asks a `DecisionSource` inline. Suspend mode raises an
/// interrupt carrying the findings and reads the answer from the resume
/// value. Either way only an explicit affirmative approves.
pub struct HumanFeedbackStage {
    input: Input,
    affirmatives: Vec<String>,
}

impl HumanFeedbackStage {
    pub fn interactive(source: Arc<dyn DecisionSource>, affirmatives: Vec<String>) -> Self {
        Self {
            input: Input::Source(source),
            affirmatives,
        }
    }

    pub fn suspending(affirmatives: Vec<String>) -> Self {
        Self {
            input: Input::Suspend,
            affirmatives,
        }
    }

    fn verdict(&self, approval: Approval, ctx: &RunContext) -> ReviewUpdate {
        info!("Session {}: findings {}", ctx.session_id, approval);
        ReviewUpdate {
            human_feedback: Some(approval.verdict()),
            ..Default::default()
        }
    }
}

/// Interrupt presented to the reviewer in suspend mode
pub fn approval_request(state: &ReviewState) -> Interrupt {
    Interrupt::new(
        APPROVAL_REQUEST,
        "code review is completed, need human approval",
    )
    .with_payload(json!({
        "findings": {
            "syntax": state.syntax_issues,
            "best_practice": state.best_practice_issues,
            "security": state.security_issues,
            "performance": state.performance_issues,
        },
        "round": state.analysis_rounds,
    }))
    .with_instructions(
        "Review the findings and respond with {\"approved\": \"yes\"} or {\"approved\": \"no\"}",
    )
}

#[async_trait]
impl Stage<ReviewState> for HumanFeedbackStage {
    async fn run(&self, state: &ReviewState, ctx: &RunContext) -> Result<ReviewUpdate> {
        if let Some(value) = &ctx.resume {
            let approval = Approval::from_resume_value(value, &self.affirmatives);
            return Ok(self.verdict(approval, ctx));
        }

        match &self.input {
            Input::Source(source) => {
                let approval = source.decide(state).await.map_err(|e| {
                    OrchestratorError::external(
                        ctx.session_id.as_str(),
                        ctx.node,
                        format!("decision source failed: {:#}", e),
                    )
                })?;
                Ok(self.verdict(approval, ctx))
            }
            Input::Suspend => Err(OrchestratorError::Interrupted(approval_request(state))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Verdict;

    struct Always(Approval);

    #[async_trait]
    impl DecisionSource for Always {
        async fn decide(&self, _review: &ReviewState) -> anyhow::Result<Approval> {
            Ok(self.0)
        }
    }

    struct Unreachable;

    #[async_trait]
    impl DecisionSource for Unreachable {
        async fn decide(&self, _review: &ReviewState) -> anyhow::Result<Approval> {
            anyhow::bail!("stdin closed")
        }
    }

    fn yes() -> Vec<String> {
        vec!["yes".to_string()]
    }

    fn reviewed() -> ReviewState {
        let mut state = ReviewState::new("x = 1", "python");
        state.syntax_issues = Some("none".to_string());
        state.best_practice_issues = Some("name x".to_string());
        state.security_issues = Some("none".to_string());
        state.performance_issues = Some("none".to_string());
        state.analysis_rounds = 1;
        state
    }

    #[tokio::test]
    async fn test_interactive_verdicts() {
        let ctx = RunContext::new("s-1", "human_feedback_node");

        let stage = HumanFeedbackStage::interactive(Arc::new(Always(Approval::Approved)), yes());
        let update = stage.run(&reviewed(), &ctx).await.unwrap();
        assert_eq!(update.human_feedback, Some(Verdict::Approved));

        let stage = HumanFeedbackStage::interactive(Arc::new(Always(Approval::Rejected)), yes());
        let update = stage.run(&reviewed(), &ctx).await.unwrap();
        assert_eq!(update.human_feedback, Some(Verdict::NeedsImprovement));
    }

    #[tokio::test]
    async fn test_source_failure_is_external() {
        let stage = HumanFeedbackStage::interactive(Arc::new(Unreachable), yes());
        let ctx = RunContext::new("s-2", "human_feedback_node");

        let err = stage.run(&reviewed(), &ctx).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::ExternalCallFailure { .. }));
        assert!(err.to_string().contains("stdin closed"));
    }

    #[tokio::test]
    async fn test_suspend_mode_raises_interrupt() {
        let stage = HumanFeedbackStage::suspending(yes());
        let ctx = RunContext::new("s-1", "human_feedback_node");

        match stage.run(&reviewed(), &ctx).await {
            Err(OrchestratorError::Interrupted(interrupt)) => {
                assert_eq!(interrupt.kind, APPROVAL_REQUEST);
                assert_eq!(interrupt.payload["findings"]["best_practice"], "name x");
                assert_eq!(interrupt.payload["round"], 1);
                assert!(interrupt.instructions.contains("approved"));
            }
            other => panic!("expected interrupt, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resume_value_decides() {
        let stage = HumanFeedbackStage::suspending(yes());

        let mut ctx = RunContext::new("s-1", "human_feedback_node");
        ctx.resume = Some(json!({"approved": "yes"}));
        let update = stage.run(&reviewed(), &ctx).await.unwrap();
        assert_eq!(update.human_feedback, Some(Verdict::Approved));

        ctx.resume = Some(json!({"approved": "maybe"}));
        let update = stage.run(&reviewed(), &ctx).await.unwrap();
        assert_eq!(update.human_feedback, Some(Verdict::NeedsImprovement));
    }
}
