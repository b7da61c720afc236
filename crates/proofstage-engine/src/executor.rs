//! Execution strategies for resolving step decisions.
//!
//! Manual mode suspends at every step until the caller decides; autonomous
//! mode resolves every step as `confirm` once its one-time consent gate has
//! been passed. The flow controller owns the strategy and the append-only
//! decision log; executors only answer "what happens at this step".

use proofstage_utils::types::{DecisionAction, SessionMode};

use crate::flow::StepRecord;

/// How an executor resolves a step that just finished loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Suspend until the caller supplies an explicit decision. Indefinite
    /// suspension is valid; there is no timeout.
    Suspend,
    /// Resolve automatically with the given action and log message.
    Auto {
        action: DecisionAction,
        message: String,
    },
}

/// Strategy interface shared by the flow controller's execution modes.
pub trait ModeExecutor: Send {
    fn resolve(&mut self, step: &StepRecord) -> Resolution;

    /// Pass the consent gate. A no-op for strategies without one.
    fn pass_gate(&mut self) {}

    /// Whether steps are allowed to run at all.
    fn gate_passed(&self) -> bool {
        true
    }
}

/// Per-step confirmation: every step suspends for an explicit decision.
#[derive(Debug, Default)]
pub struct ManualExecutor;

impl ModeExecutor for ManualExecutor {
    fn resolve(&mut self, _step: &StepRecord) -> Resolution {
        Resolution::Suspend
    }
}

/// Unattended execution behind a one-time consent gate.
///
/// The gate is a deliberate consent step: the system must not silently run
/// unattended the first time a session enters this mode for a document.
/// Until the gate is passed no step runs at all.
#[derive(Debug, Default)]
pub struct AutonomousExecutor {
    gate_passed: bool,
}

impl AutonomousExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An executor whose gate was already passed, for resuming a session
    /// that consented earlier in its lifetime.
    #[must_use]
    pub fn gated_open() -> Self {
        Self { gate_passed: true }
    }
}

impl ModeExecutor for AutonomousExecutor {
    fn resolve(&mut self, step: &StepRecord) -> Resolution {
        if !self.gate_passed {
            return Resolution::Suspend;
        }
        let issues = step.issues_found.unwrap_or(0);
        Resolution::Auto {
            action: DecisionAction::Confirm,
            message: format!(
                "auto-confirmed {} with {issues} issue(s) found",
                step.spec.id
            ),
        }
    }

    fn pass_gate(&mut self) {
        self.gate_passed = true;
    }

    fn gate_passed(&self) -> bool {
        self.gate_passed
    }
}

/// Build the executor for a session mode.
#[must_use]
pub fn executor_for(mode: SessionMode) -> Box<dyn ModeExecutor> {
    match mode {
        SessionMode::Manual => Box::new(ManualExecutor),
        SessionMode::Autonomous => Box::new(AutonomousExecutor::new()),
    }
}
