use crate::error::{OrchestratorError, Result};
use crate::graph::{RunContext, Stage};
use crate::state::{ReviewState, ReviewUpdate};
use async_trait::async_trait;

/// Entry stage: rejects empty submissions before any analysis runs
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateInputStage;

impl ValidateInputStage {
    pub fn check(code: &str, language: &str) -> Result<()> {
        if code.trim().is_empty() {
            return Err(OrchestratorError::validation("code cannot be empty"));
        }
        if language.trim().is_empty() {
            return Err(OrchestratorError::validation("language cannot be empty"));
        }
        Ok(())
    }
}

#[async_trait]
impl Stage<ReviewState> for ValidateInputStage {
    async fn run(&self, state: &ReviewState, _ctx: &RunContext) -> Result<ReviewUpdate> {
        Self::check(&state.code, &state.language)?;
        Ok(ReviewUpdate::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_accepts_code() {
        let state = ReviewState::new("def add(a, b):\n    return a + b\n", "python");
        let ctx = RunContext::new("s-1", "code_input_node");
        let update = ValidateInputStage.run(&state, &ctx).await.unwrap();
        assert_eq!(update, ReviewUpdate::default());
    }

    #[tokio::test]
    async fn test_rejects_blank_code() {
        let ctx = RunContext::new("s-1", "code_input_node");
        for code in ["", "   ", "\n\t\n"] {
            let state = ReviewState::new(code, "python");
            let err = ValidateInputStage.run(&state, &ctx).await.unwrap_err();
            assert!(matches!(err, OrchestratorError::Validation(_)));
        }
    }

    #[test]
    fn test_rejects_missing_language() {
        let err = ValidateInputStage::check("x = 1", " ").unwrap_err();
        assert!(err.to_string().contains("language"));
    }
}
