//! Backend collaborator abstraction for the proofstage orchestrator.
//!
//! The orchestrator consumes a small, stable set of operations from backend
//! collaborators; the over-the-wire format is backend-owned and only the
//! call shape matters to the pipeline. All implementations expose the
//! [`AnalysisBackend`] trait so the flow controller works against any
//! compliant backend without knowing transport details.

mod http;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use http::HttpBackend;
pub use types::{
    AnalysisOutcome, FlowStartResponse, JobStatus, MergeMode, MergeOutcome, PromptArtifact,
    RewriteResult, SessionProgress, StepResultPayload,
};

use async_trait::async_trait;

use proofstage_utils::error::FlowError;
use proofstage_utils::types::{Issue, Session, SessionMode, StepId};

/// Operations the orchestrator needs from a document-analysis backend.
///
/// Implementations must classify every failure into the [`FlowError`]
/// taxonomy; raw transport errors never cross this boundary. All durable
/// session and step state lives behind these operations; the orchestrator
/// holds no independent persistence of its own.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Run one step's analysis against a document.
    async fn analyze_step(
        &self,
        document_id: &str,
        step: StepId,
        session_id: Option<&str>,
    ) -> Result<AnalysisOutcome, FlowError>;

    /// Turn a set of selected issues into a prompt artifact or a rewrite.
    async fn merge_modify(
        &self,
        document_id: &str,
        issues: &[Issue],
        mode: MergeMode,
        notes: Option<&str>,
    ) -> Result<MergeOutcome, FlowError>;

    /// Create a session for a document in the given mode.
    async fn flow_start(
        &self,
        document_id: &str,
        mode: SessionMode,
    ) -> Result<FlowStartResponse, FlowError>;

    /// Record a confirmed step outcome; returns the updated session record.
    async fn flow_complete_level(
        &self,
        session_id: &str,
        result: &StepResultPayload,
    ) -> Result<Session, FlowError>;

    /// Record a skipped step; returns the updated session record.
    async fn flow_skip_level(
        &self,
        session_id: &str,
        step: StepId,
    ) -> Result<Session, FlowError>;

    /// Fetch overall progress of a session (autonomous-mode watching).
    async fn session_progress(&self, session_id: &str) -> Result<SessionProgress, FlowError>;

    /// Fetch the status of a background job (payment and similar).
    async fn job_status(&self, job_id: &str) -> Result<JobStatus, FlowError>;
}
