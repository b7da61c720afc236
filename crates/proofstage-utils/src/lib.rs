//! Shared foundation for the proofstage workspace.
//!
//! This crate holds the types that every other proofstage crate speaks in:
//! step and session identifiers, step status, the issue model returned by
//! analysis collaborators, the error taxonomy, and tracing initialization.
//! It has no knowledge of the pipeline's sequencing rules; those live in
//! `proofstage-engine`.

pub mod error;
pub mod logging;
pub mod types;

pub use error::{ConfigError, FlowError, ProofstageError};
pub use types::{SessionMode, SessionStatus, StepId, StepStatus};
