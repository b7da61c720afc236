//! proofstage - Staged document-analysis pipeline orchestrator
//!
//! This crate drives a fixed six-step analysis pipeline over a document:
//! each step is analyzed by a backend collaborator, suspended for a
//! confirm/skip decision (or auto-confirmed in autonomous mode), and
//! settled in strictly ascending order. Durable session state lives on the
//! backend; the orchestrator holds the in-flight state machine, the
//! invocation-idempotency guard, the merge-modify budget, and the polling
//! watchers.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use proofstage::{
//!     AnalysisBackend, Config, DecisionAction, FlowController, HttpBackend, SessionMode,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     proofstage::init_tracing(false)?;
//!
//!     let config = Config::discover()?;
//!     let backend: Arc<dyn AnalysisBackend> = Arc::new(HttpBackend::new_from_config(&config)?);
//!
//!     let mut flow = FlowController::new(backend, "doc-42", SessionMode::Manual);
//!     flow.start().await?;
//!
//!     // The first step is now awaiting a decision.
//!     flow.decide(DecisionAction::Confirm).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Stable Public API
//!
//! - [`FlowController`], [`FlowState`], [`StepRecord`] - the session state
//!   machine
//! - [`StepId`] and the pipeline registry ([`ordered`], [`canonicalize`]) -
//!   the fixed step catalog
//! - [`AnalysisBackend`], [`HttpBackend`] - the backend collaborator seam
//! - [`MergeModifyEngine`], [`MergeModifyRequest`] - batch issue handling
//!   with a bounded regeneration budget
//! - [`watch_job`], [`watch_session_progress`] - bounded status polling
//! - [`route_for`] - resume routing from interrupted-session records
//! - [`Config`] - file/env configuration discovery
//! - [`FlowError`] - the library error taxonomy

pub use proofstage_engine::{
    executor_for, watch_job, watch_job_with, watch_session_progress,
    watch_session_progress_with, AutonomousExecutor, FlowController, FlowState, ManualExecutor,
    ModeExecutor, Resolution, StepRecord,
};

pub use proofstage_backend::{
    AnalysisBackend, AnalysisOutcome, FlowStartResponse, HttpBackend, JobStatus, MergeMode,
    MergeOutcome, PromptArtifact, RewriteResult, SessionProgress, StepResultPayload,
};

pub use proofstage_merge::{MergeModifyEngine, MergeModifyRequest, MAX_REGENERATE};

pub use proofstage_registry::{canonicalize, first, next_after, ordered, spec_for, StepSpec};

pub use proofstage_resume::{canonicalize_mode, route_for, Location, ResumeTask};

pub use proofstage_guard::InvocationGuard;

pub use proofstage_poll::{
    start as start_poll, PollHandle, PollOutcome, PollResult, JOB_WATCH_INTERVAL,
    JOB_WATCH_MAX_DURATION, PROGRESS_WATCH_INTERVAL,
};

pub use proofstage_config::{BackendConfig, Config, MergeConfig, PollConfig};

pub use proofstage_utils::error::{ConfigError, FlowError, ProofstageError};
pub use proofstage_utils::logging::init_tracing;
pub use proofstage_utils::types::{
    AutoDecision, DecisionAction, Issue, ProgressSnapshot, RiskLevel, Session, SessionMode,
    SessionStatus, Severity, StepId, StepStatus, TextSpan,
};
