//! The flow controller: owns "current step" and drives every transition.
//!
//! State machine:
//!
//! ```text
//! Uninitialized → Loading(step) → AwaitingDecision(step) → Advancing
//!     → Loading(nextStep) → … → Completed
//! ```
//!
//! `Error(step, cause)` is reachable from `Loading` on collaborator
//! failure; the only ways out are `retry` (permitted because the step never
//! reached completed) and `abort`. Once a step settles, its order position
//! is closed permanently for the session; re-entering an earlier step means
//! starting a new session, never mutating this one. That monotonicity is
//! the central invariant of the subsystem.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use proofstage_backend::{AnalysisBackend, AnalysisOutcome, StepResultPayload};
use proofstage_guard::InvocationGuard;
use proofstage_registry::{ordered, StepSpec};
use proofstage_resume::Location;
use proofstage_utils::error::FlowError;
use proofstage_utils::types::{
    AutoDecision, DecisionAction, Issue, ProgressSnapshot, RiskLevel, Session, SessionMode,
    SessionStatus, StepId, StepStatus,
};

use crate::executor::{executor_for, AutonomousExecutor, ManualExecutor, ModeExecutor, Resolution};

/// Local record of one step's lifecycle within a session.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub spec: StepSpec,
    pub status: StepStatus,
    pub issues_found: Option<u32>,
    pub score_before: Option<f32>,
    pub score_after: Option<f32>,
    pub risk_level: Option<RiskLevel>,
    pub recommendations: Vec<String>,
    pub issues: Vec<Issue>,
}

impl StepRecord {
    fn pending(spec: StepSpec) -> Self {
        Self {
            spec,
            status: StepStatus::Pending,
            issues_found: None,
            score_before: None,
            score_after: None,
            risk_level: None,
            recommendations: Vec::new(),
            issues: Vec::new(),
        }
    }
}

/// Observable state of the flow controller.
#[derive(Debug, Clone)]
pub enum FlowState {
    Uninitialized,
    Loading(StepId),
    AwaitingDecision(StepId),
    Advancing,
    Completed,
    Cancelled,
    Error { step: StepId, cause: FlowError },
}

impl FlowState {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading(_) => "loading",
            Self::AwaitingDecision(_) => "awaiting_decision",
            Self::Advancing => "advancing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Error { .. } => "error",
        }
    }
}

/// Drives one session's pipeline against a backend collaborator.
pub struct FlowController {
    backend: Arc<dyn AnalysisBackend>,
    guard: InvocationGuard,
    document_id: String,
    mode: SessionMode,
    session: Option<Session>,
    steps: Vec<StepRecord>,
    cursor: usize,
    state: FlowState,
    executor: Box<dyn ModeExecutor>,
    decision_log: Vec<AutoDecision>,
    baseline: Option<String>,
}

impl FlowController {
    /// Build a controller for a fresh session. No backend call happens
    /// until [`start`](Self::start).
    #[must_use]
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        document_id: impl Into<String>,
        mode: SessionMode,
    ) -> Self {
        Self::with_executor(backend, document_id.into(), mode, executor_for(mode))
    }

    fn with_executor(
        backend: Arc<dyn AnalysisBackend>,
        document_id: String,
        mode: SessionMode,
        executor: Box<dyn ModeExecutor>,
    ) -> Self {
        let steps = ordered().iter().copied().map(StepRecord::pending).collect();
        Self {
            backend,
            guard: InvocationGuard::new(),
            document_id,
            mode,
            session: None,
            steps,
            cursor: 0,
            state: FlowState::Uninitialized,
            executor,
            decision_log: Vec::new(),
            baseline: None,
        }
    }

    /// Rebuild a controller positioned mid-pipeline from a resume location.
    ///
    /// Steps before the resume point were settled by the earlier run and
    /// are closed here too: their guard entries are marked done so they
    /// cannot silently re-run. An autonomous session resuming mid-run
    /// already consented once; its gate starts open.
    ///
    /// The resume pointer carries only the step to land on, not how each
    /// earlier step settled, so pre-resume records are all represented as
    /// completed locally. Settled counts and percent in
    /// [`progress`](Self::progress) stay accurate; the completed/skipped
    /// split for pre-resume steps is backend-owned and must be read via
    /// [`AnalysisBackend::session_progress`] when it matters.
    #[must_use]
    pub fn resume(backend: Arc<dyn AnalysisBackend>, location: &Location) -> Self {
        let executor: Box<dyn ModeExecutor> = match location.mode {
            SessionMode::Manual => Box::new(ManualExecutor),
            SessionMode::Autonomous => Box::new(AutonomousExecutor::gated_open()),
        };
        let mut controller = Self::with_executor(
            backend,
            location.document_id.clone(),
            location.mode,
            executor,
        );
        let cursor = controller
            .steps
            .iter()
            .position(|record| record.spec.id == location.step)
            .unwrap_or(0);
        for index in 0..cursor {
            controller.steps[index].status = StepStatus::Completed;
            let step = controller.steps[index].spec.id;
            controller.guard.mark_done(&controller.document_id, step);
        }
        controller.cursor = cursor;
        controller.session = Some(Session {
            session_id: location.session_id.clone(),
            document_id: location.document_id.clone(),
            mode: location.mode,
            current_step_id: location.step.as_str().to_string(),
            status: SessionStatus::Active,
        });
        controller.state = FlowState::Loading(location.step);
        controller
    }

    /// Start the session on the backend.
    ///
    /// Manual mode immediately loads the first step and suspends at its
    /// decision. Autonomous mode creates the session but runs nothing
    /// until the confirmation gate is passed and
    /// [`run_to_completion`](Self::run_to_completion) is called.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless the controller is uninitialized;
    /// otherwise the backend's classified failure.
    pub async fn start(&mut self) -> Result<(), FlowError> {
        if !matches!(self.state, FlowState::Uninitialized) {
            return Err(self.invalid("start"));
        }
        self.start_session().await?;
        match self.mode {
            SessionMode::Manual => {
                self.state = FlowState::Loading(self.steps[self.cursor].spec.id);
                self.load().await
            }
            SessionMode::Autonomous => Ok(()),
        }
    }

    async fn start_session(&mut self) -> Result<(), FlowError> {
        let response = self
            .backend
            .flow_start(&self.document_id, self.mode)
            .await?;
        info!(
            session_id = %response.session_id,
            document_id = %self.document_id,
            mode = self.mode.as_str(),
            "session started"
        );
        self.session = Some(Session {
            session_id: response.session_id,
            document_id: self.document_id.clone(),
            mode: self.mode,
            current_step_id: response.current_step,
            status: SessionStatus::Active,
        });
        Ok(())
    }

    /// Invoke the current step's analysis from the `Loading` state.
    ///
    /// Public for resumption entry points; [`start`](Self::start) and
    /// [`decide`](Self::decide) call it internally. Duplicate triggering is
    /// neutralized by the invocation guard: a second call while the first
    /// is in flight, or after the pair completed, is dropped.
    ///
    /// # Errors
    ///
    /// Collaborator failure transitions to `Error(step, cause)` and
    /// returns the cause.
    pub async fn reload(&mut self) -> Result<(), FlowError> {
        if !matches!(self.state, FlowState::Loading(_)) {
            return Err(self.invalid("reload"));
        }
        self.load().await
    }

    async fn load(&mut self) -> Result<(), FlowError> {
        let step = match self.state {
            FlowState::Loading(step) => step,
            _ => return Err(self.invalid("load")),
        };
        if !self.guard.try_enter(&self.document_id, step) {
            debug!(step = %step, "duplicate analysis invocation suppressed");
            return Ok(());
        }
        self.steps[self.cursor].status = StepStatus::InProgress;
        let session_id = self.session.as_ref().map(|s| s.session_id.clone());
        let result = self
            .backend
            .analyze_step(&self.document_id, step, session_id.as_deref())
            .await;
        match result {
            Ok(outcome) => {
                self.guard.mark_done(&self.document_id, step);
                self.record_outcome(step, outcome);
                self.state = FlowState::AwaitingDecision(step);
                Ok(())
            }
            Err(cause) => {
                self.guard.release(&self.document_id, step);
                self.steps[self.cursor].status = StepStatus::Pending;
                warn!(step = %step, error = %cause, "analysis call failed");
                self.state = FlowState::Error {
                    step,
                    cause: cause.clone(),
                };
                Err(cause)
            }
        }
    }

    /// Record an analysis result against the current step.
    ///
    /// A late-arriving result for a step that has been skipped or
    /// superseded is discarded, not applied; results are only ever
    /// recorded in non-decreasing order.
    fn record_outcome(&mut self, step: StepId, outcome: AnalysisOutcome) {
        let Some(record) = self.steps.get_mut(self.cursor) else {
            warn!(step = %step, "discarding analysis result: pipeline finished");
            return;
        };
        if record.spec.id != step || record.status.is_settled() {
            warn!(step = %step, "discarding late analysis result for superseded step");
            return;
        }
        record.issues_found = Some(outcome.issues.len() as u32);
        record.score_before = Some(outcome.score);
        record.risk_level = Some(outcome.risk_level);
        record.recommendations = outcome.recommendations;
        record.issues = outcome.issues;
    }

    /// Supply the explicit decision a suspended step is waiting on.
    ///
    /// `skip` records `skipped`, never `completed`, and still advances the
    /// order cursor. When a next step exists it is loaded immediately and
    /// the controller suspends at its decision.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless a step is awaiting a decision; otherwise
    /// the backend's classified failure.
    pub async fn decide(&mut self, action: DecisionAction) -> Result<(), FlowError> {
        if !matches!(self.state, FlowState::AwaitingDecision(_)) {
            return Err(self.invalid("decide"));
        }
        self.apply_decision(action).await?;
        if matches!(self.state, FlowState::Loading(_)) {
            self.load().await?;
        }
        Ok(())
    }

    async fn apply_decision(&mut self, action: DecisionAction) -> Result<(), FlowError> {
        let step = self.steps[self.cursor].spec.id;
        self.state = FlowState::Advancing;
        let session_id = self
            .session
            .as_ref()
            .map(|s| s.session_id.clone())
            .unwrap_or_default();

        let result = match action {
            DecisionAction::Confirm => {
                let record = &self.steps[self.cursor];
                let payload = StepResultPayload {
                    step_id: step,
                    status: StepStatus::Completed,
                    issues_found: record.issues_found,
                    score_before: record.score_before,
                    score_after: record.score_after,
                };
                self.backend.flow_complete_level(&session_id, &payload).await
            }
            DecisionAction::Skip => self.backend.flow_skip_level(&session_id, step).await,
        };

        match result {
            Ok(_updated) => {
                self.steps[self.cursor].status = match action {
                    DecisionAction::Confirm => StepStatus::Completed,
                    DecisionAction::Skip => StepStatus::Skipped,
                };
                debug!(step = %step, action = action.as_str(), "step settled");
                self.advance();
                Ok(())
            }
            Err(cause) => {
                // The decision was not recorded; suspend at it again so the
                // caller can re-issue it.
                warn!(step = %step, error = %cause, "failed to record step outcome");
                self.state = FlowState::AwaitingDecision(step);
                Err(cause)
            }
        }
    }

    fn advance(&mut self) {
        self.cursor += 1;
        if self.cursor >= self.steps.len() {
            if let Some(session) = &mut self.session {
                session.status = SessionStatus::Completed;
            }
            info!(document_id = %self.document_id, "pipeline completed");
            self.state = FlowState::Completed;
        } else {
            let next = self.steps[self.cursor].spec.id;
            if let Some(session) = &mut self.session {
                session.current_step_id = next.as_str().to_string();
            }
            self.state = FlowState::Loading(next);
        }
    }

    /// Pass the autonomous confirmation gate.
    pub fn pass_autonomous_gate(&mut self) {
        self.executor.pass_gate();
    }

    /// Drive the pipeline until it suspends, completes, or fails.
    ///
    /// With a gated-open autonomous executor this runs every remaining
    /// step, appending one decision-log entry per auto-confirmation. A
    /// manual controller suspends at the first decision. Aborting a run
    /// does not rewrite the session's mode; the session can be resumed
    /// manually from the step it reached.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` while the confirmation gate is closed; a
    /// collaborator failure leaves the controller in `Error` and returns
    /// the cause.
    pub async fn run_to_completion(&mut self) -> Result<(), FlowError> {
        if !self.executor.gate_passed() {
            return Err(FlowError::InvalidTransition {
                operation: "run_to_completion",
                state: "awaiting confirmation gate".to_string(),
            });
        }
        loop {
            match self.state.clone() {
                FlowState::Uninitialized => {
                    if self.session.is_none() {
                        self.start_session().await?;
                    }
                    self.state = FlowState::Loading(self.steps[self.cursor].spec.id);
                }
                FlowState::Loading(_) => self.load().await?,
                FlowState::AwaitingDecision(_) => {
                    match self.executor.resolve(&self.steps[self.cursor]) {
                        Resolution::Suspend => return Ok(()),
                        Resolution::Auto { action, message } => {
                            let step = self.steps[self.cursor].spec.id;
                            info!(step = %step, action = action.as_str(), "{message}");
                            self.decision_log.push(AutoDecision {
                                step_id: step,
                                action,
                                message,
                                timestamp: Utc::now(),
                            });
                            self.apply_decision(action).await?;
                        }
                    }
                }
                FlowState::Advancing => {
                    // Transient while a decision is applied; never rests here.
                    return Err(self.invalid("run_to_completion"));
                }
                FlowState::Completed | FlowState::Cancelled => return Ok(()),
                FlowState::Error { cause, .. } => return Err(cause),
            }
        }
    }

    /// Re-invoke the failed step's analysis from the `Error` state.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside `Error`; otherwise the collaborator's
    /// classified failure (returning to `Error` on repeat).
    pub async fn retry(&mut self) -> Result<(), FlowError> {
        let step = match &self.state {
            FlowState::Error { step, .. } => *step,
            _ => return Err(self.invalid("retry")),
        };
        self.state = FlowState::Loading(step);
        self.load().await
    }

    /// Give up on the failed step and stop the session.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside `Error`.
    pub fn abort(&mut self) -> Result<(), FlowError> {
        if !matches!(self.state, FlowState::Error { .. }) {
            return Err(self.invalid("abort"));
        }
        if let Some(session) = &mut self.session {
            session.status = SessionStatus::Paused;
        }
        info!(document_id = %self.document_id, "session aborted");
        self.state = FlowState::Cancelled;
        Ok(())
    }

    /// Adopt an accepted rewrite as the new baseline for subsequent steps.
    pub fn adopt_rewrite(&mut self, text: String) {
        info!(
            document_id = %self.document_id,
            bytes = text.len(),
            "adopted rewrite as analysis baseline"
        );
        self.baseline = Some(text);
    }

    #[must_use]
    pub fn baseline(&self) -> Option<&str> {
        self.baseline.as_deref()
    }

    #[must_use]
    pub fn state(&self) -> &FlowState {
        &self.state
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    #[must_use]
    pub fn current_step(&self) -> Option<&StepRecord> {
        self.steps.get(self.cursor)
    }

    #[must_use]
    pub fn guard(&self) -> &InvocationGuard {
        &self.guard
    }

    /// Ordered, append-only log of autonomous decisions.
    #[must_use]
    pub fn decision_log(&self) -> &[AutoDecision] {
        &self.decision_log
    }

    /// Advisory progress derived from local step records.
    #[must_use]
    pub fn progress(&self) -> ProgressSnapshot {
        let completed = self
            .steps
            .iter()
            .filter(|r| r.status == StepStatus::Completed)
            .count();
        let skipped = self
            .steps
            .iter()
            .filter(|r| r.status == StepStatus::Skipped)
            .count();
        let total = self.steps.len();
        let percent = if total == 0 {
            100
        } else {
            (((completed + skipped) * 100) / total) as u8
        };
        ProgressSnapshot {
            completed,
            skipped,
            total,
            percent,
        }
    }

    fn invalid(&self, operation: &'static str) -> FlowError {
        FlowError::InvalidTransition {
            operation,
            state: self.state.name().to_string(),
        }
    }
}
