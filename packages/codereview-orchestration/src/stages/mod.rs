// Stage implementations
pub mod analysis_stage;
pub mod analyze_stage;
pub mod feedback_stage;
pub mod report_stage;
pub mod validate_stage;

// Re-exports
pub use analysis_stage::FindingStage;
pub use analyze_stage::AnalyzeCodeStage;
pub use feedback_stage::{approval_request, HumanFeedbackStage, APPROVAL_REQUEST};
pub use report_stage::FinalReportStage;
pub use validate_stage::ValidateInputStage;
