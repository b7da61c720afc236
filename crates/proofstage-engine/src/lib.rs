//! Pipeline orchestration: the flow controller state machine, the two
//! execution strategies, and the status-watching helpers built on the
//! polling primitive.
//!
//! There is exactly one active step per session at any time; the monotonic
//! order invariant, not locking, enforces it. Suspension points are the
//! `AwaitingDecision` state (manual mode, indefinite) and the `Loading`
//! state (bounded by the collaborator's network timeout).

mod executor;
mod flow;
mod watch;

pub use executor::{executor_for, AutonomousExecutor, ManualExecutor, ModeExecutor, Resolution};
pub use flow::{FlowController, FlowState, StepRecord};
pub use watch::{watch_job, watch_job_with, watch_session_progress, watch_session_progress_with};
