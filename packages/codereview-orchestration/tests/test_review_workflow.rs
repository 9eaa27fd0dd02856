//! End-to-end review scenarios with deterministic collaborators
//!
//! - approval on the first pass
//! - rejections looping back through the analysis sub-pipeline
//! - input validation before any collaborator call
//! - sequential and parallel analysis agree

mod common;

use codereview_orchestration::{
    Approval, DecisionMode, OrchestratorError, ReviewConfig, ReviewDriver, ReviewOutcome,
    ReviewRequest, SessionState,
};
use common::{Harness, ScriptedDecision, SAMPLE_CODE};
use pretty_assertions::assert_eq;
use serde_json::json;

fn request() -> ReviewRequest {
    ReviewRequest::new(SAMPLE_CODE, "python")
}

#[tokio::test]
async fn test_approve_first_pass() {
    let harness = Harness::new(ScriptedDecision::new([Approval::Approved]));
    let driver = ReviewDriver::new(&harness.collaborators(), &ReviewConfig::default()).unwrap();

    let outcome = driver.review("s-approve", request()).await.unwrap();
    let report = outcome.report().expect("review should complete").clone();

    assert_eq!(harness.per_aspect_calls(), [1, 1, 1, 1]);
    assert_eq!(harness.analysis_calls(), 4);
    assert_eq!(harness.decision.calls(), 1);
    assert_eq!(harness.synthesizer.calls(), 1);

    assert_eq!(report.session_id, "s-approve");
    assert_eq!(report.language, "python");
    assert_eq!(report.rounds, 1);
    assert!(!report.report.trim().is_empty());
    assert!(report.report.contains("security finding #1 for python"));
    assert!(report.findings.is_complete());

    // Completed sessions leave neither a checkpoint nor a session record
    assert!(driver.checkpoint("s-approve").await.unwrap().is_none());
    assert!(driver.session("s-approve").await.is_none());
    assert!(driver.sessions().is_empty());
}

#[tokio::test]
async fn test_session_table_shrinks_as_reviews_complete() {
    let harness = Harness::new(ScriptedDecision::new([]));
    let mut config = ReviewConfig::default();
    config.decision.mode = DecisionMode::Interrupt;
    let driver = ReviewDriver::new(&harness.collaborators(), &config).unwrap();

    driver.review("s-1", request()).await.unwrap();
    driver.review("s-2", request()).await.unwrap();
    assert_eq!(driver.sessions().ids(), ["s-1", "s-2"]);

    let outcome = driver
        .resume("s-1", json!({"approved": "yes"}))
        .await
        .unwrap();
    assert!(outcome.report().is_some());
    assert_eq!(driver.sessions().ids(), ["s-2"]);

    driver
        .resume("s-2", json!({"approved": "yes"}))
        .await
        .unwrap();
    assert!(driver.sessions().is_empty());
}

#[tokio::test]
async fn test_forget_drops_only_idle_sessions() {
    let harness = Harness::new(ScriptedDecision::new([]));
    let driver = ReviewDriver::new(&harness.collaborators(), &ReviewConfig::default()).unwrap();

    // Decision source fails, the session keeps its checkpoint
    driver.review("s-idle", request()).await.unwrap_err();
    let err = driver.forget("s-idle").await.unwrap_err();
    assert!(matches!(err, OrchestratorError::InvalidStateTransition { .. }));

    driver.abandon("s-idle", "giving up").await.unwrap();
    assert!(matches!(
        driver.session("s-idle").await.unwrap().state,
        SessionState::Abandoned { .. }
    ));

    assert!(driver.forget("s-idle").await.unwrap());
    assert!(driver.session("s-idle").await.is_none());
    assert!(!driver.forget("s-idle").await.unwrap());
}

#[tokio::test]
async fn test_reject_reject_approve() {
    let harness = Harness::new(ScriptedDecision::new([
        Approval::Rejected,
        Approval::Rejected,
        Approval::Approved,
    ]));
    let driver = ReviewDriver::new(&harness.collaborators(), &ReviewConfig::default()).unwrap();

    let outcome = driver.review("s-loop", request()).await.unwrap();
    let report = outcome.report().expect("review should complete");

    assert_eq!(harness.per_aspect_calls(), [3, 3, 3, 3]);
    assert_eq!(harness.analysis_calls(), 12);
    assert_eq!(harness.decision.calls(), 3);
    assert_eq!(harness.synthesizer.calls(), 1);
    assert_eq!(report.rounds, 3);

    // Findings come from the last round only
    assert_eq!(
        report.findings.syntax.as_deref(),
        Some("syntax finding #3 for python")
    );
    assert!(!report.report.contains("#1"));
    assert!(!report.report.contains("#2"));
}

#[tokio::test]
async fn test_n_rejections_run_pipeline_n_plus_one_times() {
    for rejections in 0..5usize {
        let mut script = vec![Approval::Rejected; rejections];
        script.push(Approval::Approved);

        let harness = Harness::new(ScriptedDecision::new(script));
        let driver =
            ReviewDriver::new(&harness.collaborators(), &ReviewConfig::default()).unwrap();

        let outcome = driver.review("s-n", request()).await.unwrap();
        let report = outcome.report().expect("review should complete");

        assert_eq!(report.rounds as usize, rejections + 1);
        assert_eq!(harness.analysis_calls(), 4 * (rejections + 1));
        assert_eq!(harness.synthesizer.calls(), 1);
    }
}

#[tokio::test]
async fn test_empty_code_is_rejected_before_any_call() {
    let harness = Harness::new(ScriptedDecision::always(Approval::Approved));
    let driver = ReviewDriver::new(&harness.collaborators(), &ReviewConfig::default()).unwrap();

    for code in ["", "   \n\t"] {
        let err = driver
            .review("s-empty", ReviewRequest::new(code, "python"))
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Validation(_)));
    }

    assert_eq!(harness.analysis_calls(), 0);
    assert_eq!(harness.decision.calls(), 0);
    assert_eq!(harness.synthesizer.calls(), 0);
    assert!(driver.session("s-empty").await.is_none());
    assert!(driver.checkpoint("s-empty").await.unwrap().is_none());
}

#[tokio::test]
async fn test_validation_inside_graph_fails_at_entry_node() {
    let harness = Harness::new(ScriptedDecision::always(Approval::Approved));
    let config = ReviewConfig::default();
    let graph = codereview_orchestration::build_review_graph(
        &harness.collaborators(),
        &config,
        None,
    )
    .unwrap();

    let err = graph
        .invoke(codereview_orchestration::ReviewState::new("", "python"), "s-1")
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::Validation(_)));
    assert_eq!(harness.analysis_calls(), 0);
}

#[tokio::test]
async fn test_parallel_analysis_matches_sequential() {
    let mut config = ReviewConfig::default();
    config.analysis.parallel = true;

    let harness = Harness::new(ScriptedDecision::new([
        Approval::Rejected,
        Approval::Approved,
    ]));
    let driver = ReviewDriver::new(&harness.collaborators(), &config).unwrap();

    let outcome = driver.review("s-par", request()).await.unwrap();
    let report = outcome.report().expect("review should complete");

    assert_eq!(harness.per_aspect_calls(), [2, 2, 2, 2]);
    assert_eq!(report.rounds, 2);
    assert_eq!(
        report.findings.performance.as_deref(),
        Some("performance finding #2 for python")
    );
}

#[tokio::test]
async fn test_decision_failure_is_external_and_retryable() {
    // Empty script: the decision source errors on first use
    let harness = Harness::new(ScriptedDecision::new([]));
    let driver = ReviewDriver::new(&harness.collaborators(), &ReviewConfig::default()).unwrap();

    let err = driver.review("s-dec", request()).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.session_id(), Some("s-dec"));
    assert!(err.to_string().contains("human_feedback_node"));

    let snapshot = driver.checkpoint("s-dec").await.unwrap().unwrap();
    assert_eq!(snapshot.node, "analyze_code_node");
    assert_eq!(snapshot.state.analysis_rounds, 1);

    let session = driver.session("s-dec").await.unwrap();
    assert_eq!(session.state.state_name(), "failed");
}

#[tokio::test]
async fn test_report_serializes() {
    let harness = Harness::new(ScriptedDecision::new([Approval::Approved]));
    let driver = ReviewDriver::new(&harness.collaborators(), &ReviewConfig::default()).unwrap();

    let outcome = driver.review("s-json", request()).await.unwrap();
    let report = match outcome {
        ReviewOutcome::Completed(report) => report,
        other => panic!("expected completion, got {other:?}"),
    };

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["session_id"], "s-json");
    assert_eq!(value["rounds"], 1);
    assert!(value["report"].as_str().unwrap().starts_with("# python review"));
}
