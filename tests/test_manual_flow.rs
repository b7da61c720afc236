//! End-to-end manual-mode sessions through the public API.

use std::sync::Arc;

use proofstage::{
    AnalysisBackend, DecisionAction, FlowController, FlowError, FlowState, SessionMode,
    SessionStatus, StepId, StepStatus,
};
use proofstage_backend::mock::MockBackend;

fn manual_flow() -> (FlowController, Arc<MockBackend>) {
    let backend = Arc::new(MockBackend::new());
    let flow = FlowController::new(
        Arc::clone(&backend) as Arc<dyn AnalysisBackend>,
        "doc-100",
        SessionMode::Manual,
    );
    (flow, backend)
}

#[tokio::test]
async fn full_session_confirming_every_step() {
    let (mut flow, backend) = manual_flow();
    flow.start().await.unwrap();

    let mut suspended_at = Vec::new();
    while !matches!(flow.state(), FlowState::Completed) {
        let FlowState::AwaitingDecision(step) = flow.state() else {
            panic!("manual flow must suspend between steps, got {:?}", flow.state());
        };
        suspended_at.push(*step);
        flow.decide(DecisionAction::Confirm).await.unwrap();
    }

    assert_eq!(
        suspended_at,
        vec![
            StepId::StructureScan,
            StepId::SectionFlow,
            StepId::ConnectorAnalysis,
            StepId::FingerprintAnalysis,
            StepId::SentenceRhythm,
            StepId::LexicalDiversity,
        ]
    );
    assert_eq!(backend.analyze_call_count(), 6);
    assert_eq!(flow.session().unwrap().status, SessionStatus::Completed);
    assert_eq!(flow.progress().percent, 100);
}

#[tokio::test]
async fn mixed_confirm_and_skip_settles_each_step_exactly_once() {
    let (mut flow, _backend) = manual_flow();
    flow.start().await.unwrap();

    flow.decide(DecisionAction::Confirm).await.unwrap();
    flow.decide(DecisionAction::Skip).await.unwrap();
    flow.decide(DecisionAction::Skip).await.unwrap();
    flow.decide(DecisionAction::Confirm).await.unwrap();
    flow.decide(DecisionAction::Confirm).await.unwrap();
    flow.decide(DecisionAction::Skip).await.unwrap();

    let statuses: Vec<StepStatus> = flow.steps().iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            StepStatus::Completed,
            StepStatus::Skipped,
            StepStatus::Skipped,
            StepStatus::Completed,
            StepStatus::Completed,
            StepStatus::Skipped,
        ]
    );
    assert!(matches!(flow.state(), FlowState::Completed));

    let snapshot = flow.progress();
    assert_eq!(snapshot.completed, 3);
    assert_eq!(snapshot.skipped, 3);
    assert_eq!(snapshot.total, 6);
}

#[tokio::test]
async fn decisions_are_rejected_outside_suspension() {
    let (mut flow, _backend) = manual_flow();

    // Before start there is nothing to decide on.
    let err = flow.decide(DecisionAction::Confirm).await.unwrap_err();
    assert!(matches!(err, FlowError::InvalidTransition { .. }));

    flow.start().await.unwrap();
    for _ in 0..6 {
        flow.decide(DecisionAction::Confirm).await.unwrap();
    }

    // After completion, further decisions are rejected too.
    let err = flow.decide(DecisionAction::Skip).await.unwrap_err();
    assert!(matches!(err, FlowError::InvalidTransition { .. }));
}

#[tokio::test]
async fn missing_document_fails_session_start() {
    let (mut flow, backend) = manual_flow();
    backend.forget_document("doc-100");

    let err = flow.start().await.unwrap_err();
    assert!(matches!(
        err,
        FlowError::NotFound { resource: "document", .. }
    ));
    assert_eq!(backend.analyze_call_count(), 0);
}

#[tokio::test]
async fn transient_analysis_failure_is_retryable_in_place() {
    let (mut flow, backend) = manual_flow();
    flow.start().await.unwrap();
    flow.decide(DecisionAction::Confirm).await.unwrap();

    // Fail the third step twice, then let it through.
    backend.fail_next_analyze(FlowError::transient("502 bad gateway"));
    flow.decide(DecisionAction::Confirm).await.unwrap_err();
    backend.fail_next_analyze(FlowError::transient("502 bad gateway"));
    flow.retry().await.unwrap_err();
    flow.retry().await.unwrap();

    assert!(matches!(
        flow.state(),
        FlowState::AwaitingDecision(StepId::ConnectorAnalysis)
    ));
    // The two settled steps were untouched by the failures.
    assert_eq!(flow.steps()[0].status, StepStatus::Completed);
    assert_eq!(flow.steps()[1].status, StepStatus::Completed);
}

#[tokio::test]
async fn step_records_carry_analysis_results_for_rendering() {
    let (mut flow, backend) = manual_flow();
    backend.set_issues_per_step(4);
    flow.start().await.unwrap();

    let record = flow.current_step().unwrap();
    assert_eq!(record.issues_found, Some(4));
    assert_eq!(record.issues.len(), 4);
    assert!(record.score_before.is_some());
    assert!(record.risk_level.is_some());
    assert!(!record.recommendations.is_empty());
    // Bilingual descriptions survive the trip untouched.
    assert!(!record.issues[0].description_zh.is_empty());
    assert!(!record.issues[0].description_en.is_empty());
}
