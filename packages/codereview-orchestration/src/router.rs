use crate::error::{OrchestratorError, Result};
use crate::graph::Router;
use crate::state::{ReviewState, Verdict};

/// Routes the decision node: approved findings go to the report, anything
/// else back to analysis
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedbackRouter;

impl FeedbackRouter {
    pub const APPROVED: &'static str = "approved";
    pub const NEEDS_IMPROVEMENT: &'static str = "needs_improvement";

    pub fn label(verdict: Verdict) -> &'static str {
        match verdict {
            Verdict::Approved => Self::APPROVED,
            Verdict::NeedsImprovement => Self::NEEDS_IMPROVEMENT,
        }
    }
}

impl Router<ReviewState> for FeedbackRouter {
    fn route(&self, state: &ReviewState) -> Result<String> {
        state
            .human_feedback
            .map(|verdict| Self::label(verdict).to_string())
            .ok_or_else(|| {
                OrchestratorError::routing("human_feedback is not set after the decision node")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::Approval;
    use proptest::prelude::*;

    #[test]
    fn test_missing_verdict_is_routing_error() {
        let err = FeedbackRouter
            .route(&ReviewState::new("x", "python"))
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Routing { .. }));
    }

    proptest! {
        #[test]
        fn prop_every_approval_routes(approved in any::<bool>(), rounds in 0u32..100) {
            let approval = if approved { Approval::Approved } else { Approval::Rejected };
            let mut state = ReviewState::new("x", "python");
            state.human_feedback = Some(approval.verdict());
            state.analysis_rounds = rounds;

            let label = FeedbackRouter.route(&state).unwrap();
            let expected = if approved {
                FeedbackRouter::APPROVED
            } else {
                FeedbackRouter::NEEDS_IMPROVEMENT
            };
            prop_assert_eq!(label.as_str(), expected);
        }
    }
}
