//! Resume routing: interrupted-session records, including records written
//! by older releases with legacy step ids and mode labels, must land the
//! user on a valid step.

use std::sync::Arc;

use proofstage::{
    route_for, AnalysisBackend, FlowController, FlowState, Location, ResumeTask, SessionMode,
    StepId, StepStatus,
};
use proofstage_backend::mock::MockBackend;

fn task(step: &str, mode: &str) -> ResumeTask {
    ResumeTask {
        current_step_id: step.to_string(),
        mode: mode.to_string(),
        session_id: "sess-restore".to_string(),
        document_id: "doc-restore".to_string(),
    }
}

#[test]
fn canonical_ids_route_to_themselves() {
    let location = route_for(&task("layer3-step3-0", "manual"));
    assert_eq!(location.step, StepId::FingerprintAnalysis);
    assert_eq!(location.mode, SessionMode::Manual);
}

#[test]
fn legacy_step_ids_map_to_their_modern_equivalents() {
    let cases = [
        ("step1-1", StepId::StructureScan),
        ("step1-2", StepId::ConnectorAnalysis),
        ("level2", StepId::FingerprintAnalysis),
        ("level3", StepId::SentenceRhythm),
    ];
    for (legacy, expected) in cases {
        let location = route_for(&task(legacy, "auto"));
        assert_eq!(location.step, expected, "legacy id {legacy}");
        assert_eq!(location.mode, SessionMode::Autonomous);
    }
}

#[test]
fn unknown_step_id_falls_back_to_the_first_step() {
    let location = route_for(&task("layer9-step9-9", "manual"));
    assert_eq!(location.step, StepId::StructureScan);
}

#[test]
fn legacy_mode_labels_are_recognized() {
    assert_eq!(
        route_for(&task("layer5-step1-1", "intervention")).mode,
        SessionMode::Manual
    );
    assert_eq!(
        route_for(&task("layer5-step1-1", "auto")).mode,
        SessionMode::Autonomous
    );
    // Unrecognized mode labels degrade to manual, the attended default.
    assert_eq!(
        route_for(&task("layer5-step1-1", "turbo")).mode,
        SessionMode::Manual
    );
}

#[test]
fn location_path_carries_layer_step_session_and_mode() {
    let location = route_for(&task("layer2-step4-0", "manual"));
    let path = location.to_path();
    assert!(path.starts_with("/analysis/doc-restore/layer2/layer2-step4-0"));
    assert!(path.contains("session=sess-restore"));
    assert!(path.contains("mode=manual"));
}

#[tokio::test]
async fn resumed_controller_continues_from_the_routed_step() {
    let backend = Arc::new(MockBackend::new());
    let location: Location = route_for(&task("level2", "intervention"));

    let mut flow = FlowController::resume(
        Arc::clone(&backend) as Arc<dyn AnalysisBackend>,
        &location,
    );
    // Steps before the resume point are closed.
    for record in &flow.steps()[..3] {
        assert_eq!(record.status, StepStatus::Completed);
    }
    flow.reload().await.unwrap();
    assert!(matches!(
        flow.state(),
        FlowState::AwaitingDecision(StepId::FingerprintAnalysis)
    ));
    assert_eq!(backend.analyze_call_count(), 1);
}
