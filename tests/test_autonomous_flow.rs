//! Autonomous-mode sessions: the consent gate, the decision log, and
//! recovery from mid-run failures.

use std::sync::Arc;

use proofstage::{
    AnalysisBackend, DecisionAction, FlowController, FlowError, FlowState, SessionMode,
    SessionStatus, StepStatus,
};
use proofstage_backend::mock::MockBackend;

fn autonomous_flow() -> (FlowController, Arc<MockBackend>) {
    let backend = Arc::new(MockBackend::new());
    let flow = FlowController::new(
        Arc::clone(&backend) as Arc<dyn AnalysisBackend>,
        "doc-200",
        SessionMode::Autonomous,
    );
    (flow, backend)
}

#[tokio::test]
async fn nothing_runs_until_the_gate_is_passed() {
    let (mut flow, backend) = autonomous_flow();
    flow.start().await.unwrap();

    // The session exists but no analysis was triggered.
    assert!(flow.session().is_some());
    assert_eq!(backend.analyze_call_count(), 0);

    let err = flow.run_to_completion().await.unwrap_err();
    assert!(matches!(err, FlowError::InvalidTransition { .. }));
    assert_eq!(backend.analyze_call_count(), 0);
    assert!(flow.steps().iter().all(|r| r.status == StepStatus::Pending));
}

#[tokio::test]
async fn gated_run_confirms_all_six_steps_in_order() {
    let (mut flow, backend) = autonomous_flow();
    flow.start().await.unwrap();
    flow.pass_autonomous_gate();
    flow.run_to_completion().await.unwrap();

    assert!(matches!(flow.state(), FlowState::Completed));
    assert_eq!(flow.session().unwrap().status, SessionStatus::Completed);
    assert!(flow
        .steps()
        .iter()
        .all(|r| r.status == StepStatus::Completed));

    let calls = backend.analyze_calls();
    assert_eq!(calls.len(), 6);
    for pair in calls.windows(2) {
        assert!(pair[0].1.order() < pair[1].1.order());
    }
}

#[tokio::test]
async fn decision_log_has_one_ordered_entry_per_step() {
    let (mut flow, _backend) = autonomous_flow();
    flow.start().await.unwrap();
    flow.pass_autonomous_gate();
    flow.run_to_completion().await.unwrap();

    let log = flow.decision_log();
    assert_eq!(log.len(), 6);
    for (entry, record) in log.iter().zip(flow.steps()) {
        assert_eq!(entry.step_id, record.spec.id);
        assert_eq!(entry.action, DecisionAction::Confirm);
        assert!(entry.message.contains("auto-confirmed"));
        assert!(entry.message.contains("2 issue(s)"));
    }
    for pair in log.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
}

#[tokio::test]
async fn mid_run_failure_stops_at_the_failed_step() {
    let (mut flow, backend) = autonomous_flow();
    flow.start().await.unwrap();
    flow.pass_autonomous_gate();

    backend.fail_next_analyze(FlowError::transient("timeout"));
    flow.run_to_completion().await.unwrap_err();

    assert!(matches!(flow.state(), FlowState::Error { .. }));
    let settled = flow
        .steps()
        .iter()
        .filter(|r| r.status == StepStatus::Completed)
        .count();
    assert_eq!(settled, 0);
    assert_eq!(flow.decision_log().len(), 0);

    // Retrying resumes from the failed step, not from scratch.
    flow.retry().await.unwrap();
    flow.run_to_completion().await.unwrap();
    assert!(matches!(flow.state(), FlowState::Completed));
    assert_eq!(flow.decision_log().len(), 6);
    assert_eq!(backend.analyze_call_count(), 6);
}

#[tokio::test]
async fn abort_after_failure_cancels_without_rerunning_anything() {
    let (mut flow, backend) = autonomous_flow();
    flow.start().await.unwrap();
    flow.pass_autonomous_gate();
    backend.fail_next_analyze(FlowError::transient("reset"));
    flow.run_to_completion().await.unwrap_err();

    flow.abort().unwrap();
    assert!(matches!(flow.state(), FlowState::Cancelled));
    assert_eq!(flow.session().unwrap().status, SessionStatus::Paused);
    assert_eq!(backend.analyze_call_count(), 0);

    // A cancelled session is inert: driving it again does nothing.
    flow.run_to_completion().await.unwrap();
    assert!(matches!(flow.state(), FlowState::Cancelled));
    assert_eq!(backend.analyze_call_count(), 0);
}
