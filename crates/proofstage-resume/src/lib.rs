//! Resume routing: persisted step identifier → typed entry location.
//!
//! A session interrupted mid-pipeline is reopened from a task list whose
//! records carry the raw step id the backend last persisted. That id may be
//! canonical, legacy, or garbage; routing is a total function and must never
//! strand the user on an error page. Unknown ids land on the pipeline's
//! first entry.

use serde::{Deserialize, Serialize};
use tracing::warn;

use proofstage_registry::{canonicalize, spec_for};
use proofstage_utils::types::{SessionMode, StepId};

/// A persisted task-list record describing an interrupted session.
///
/// Fields arrive as raw strings exactly as the backend stored them; both
/// the step id and the mode may use legacy vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeTask {
    pub current_step_id: String,
    pub mode: String,
    pub session_id: String,
    pub document_id: String,
}

/// A resolved, always-valid entry location for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Canonical step the session reopens at.
    pub step: StepId,
    /// Execution mode the session reopens in.
    pub mode: SessionMode,
    pub session_id: String,
    pub document_id: String,
}

impl Location {
    /// Render the location as a client route path.
    #[must_use]
    pub fn to_path(&self) -> String {
        format!(
            "/analysis/{}/layer{}/{}?session={}&mode={}",
            self.document_id,
            self.step.layer(),
            self.step.as_str(),
            self.session_id,
            self.mode.as_str(),
        )
    }
}

/// Map a persisted mode string onto [`SessionMode`].
///
/// The previous client shipped with mode names `"intervention"` (per-step
/// confirmation) and `"auto"`; both are still present in stored task
/// records. Unknown modes resume manually, the conservative choice.
#[must_use]
pub fn canonicalize_mode(raw: &str) -> SessionMode {
    match raw {
        "manual" | "intervention" => SessionMode::Manual,
        "autonomous" | "auto" => SessionMode::Autonomous,
        other => {
            warn!(raw_mode = other, "unrecognized session mode, resuming manually");
            SessionMode::Manual
        }
    }
}

/// Resolve a task record to the entry location of its session.
///
/// Pure and total: the stored step id is canonicalized through the step
/// registry (legacy ids included, unknown ids falling back to the first
/// step) and the session coordinates are substituted into the location.
#[must_use]
pub fn route_for(task: &ResumeTask) -> Location {
    let step = canonicalize(&task.current_step_id);
    // spec_for is total; the lookup pins the step to its catalog entry.
    let spec = spec_for(step);
    Location {
        step: spec.id,
        mode: canonicalize_mode(&task.mode),
        session_id: task.session_id.clone(),
        document_id: task.document_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proofstage_registry::first;

    fn task(step_id: &str, mode: &str) -> ResumeTask {
        ResumeTask {
            current_step_id: step_id.to_string(),
            mode: mode.to_string(),
            session_id: "sess-7".to_string(),
            document_id: "doc-3".to_string(),
        }
    }

    #[test]
    fn canonical_ids_route_to_themselves() {
        let loc = route_for(&task("layer2-step4-0", "manual"));
        assert_eq!(loc.step, StepId::SentenceRhythm);
        assert_eq!(loc.mode, SessionMode::Manual);
    }

    #[test]
    fn legacy_step_and_mode_resolve_to_canonical_entry() {
        let loc = route_for(&task("step1-2", "intervention"));
        assert_eq!(loc.step, StepId::ConnectorAnalysis);
        assert_eq!(loc.mode, SessionMode::Manual);
        assert!(loc.to_path().contains("layer4-step2-0"));
    }

    #[test]
    fn unknown_ids_route_to_first_entry_never_an_error() {
        let loc = route_for(&task("completely-bogus", "manual"));
        assert_eq!(loc.step, first());

        let loc = route_for(&task("", ""));
        assert_eq!(loc.step, first());
        assert_eq!(loc.mode, SessionMode::Manual);
    }

    #[test]
    fn location_path_carries_session_coordinates() {
        let loc = route_for(&task("level3", "auto"));
        let path = loc.to_path();
        assert_eq!(loc.mode, SessionMode::Autonomous);
        assert!(path.starts_with("/analysis/doc-3/layer2/layer2-step4-0"));
        assert!(path.contains("session=sess-7"));
        assert!(path.contains("mode=autonomous"));
    }
}
