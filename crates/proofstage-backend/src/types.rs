//! Wire-facing types shared by every backend implementation.

use serde::{Deserialize, Serialize};

use proofstage_utils::types::{Issue, RiskLevel, SessionStatus, StepId, StepStatus};

/// Result of one step's analysis call.
///
/// The orchestrator never inspects the analysis semantics; it stores the
/// shape (issues, score, risk, recommendations) on the step record for the
/// caller to render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    #[serde(default)]
    pub issues: Vec<Issue>,
    pub score: f32,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Target mode of a merge-modify call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Produce a reusable instruction artifact; no rewrite, no budget.
    Prompt,
    /// Produce a materialized rewrite, subject to the regeneration budget.
    Apply,
}

impl MergeMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Apply => "apply",
        }
    }
}

/// Human-readable instruction artifact from prompt-mode merge-modify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptArtifact {
    pub instructions: String,
}

/// Materialized rewrite from apply-mode merge-modify.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteResult {
    pub modified_text: String,
    pub changes_summary: String,
    pub changes_count: u32,
    /// Attempts the backend is still willing to grant for this selection.
    pub remaining_attempts: u32,
}

/// Either outcome of a merge-modify call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MergeOutcome {
    Rewrite(RewriteResult),
    Prompt(PromptArtifact),
}

/// Response to `flow_start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowStartResponse {
    pub session_id: String,
    /// Raw step id as the backend stores it; canonicalized by the caller.
    pub current_step: String,
}

/// Outcome payload reported to `flow_complete_level` / `flow_skip_level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResultPayload {
    pub step_id: StepId,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues_found: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_before: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_after: Option<f32>,
}

/// Response to `session_progress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProgress {
    pub status: SessionStatus,
    pub percent_complete: u8,
}

/// Status of an observed background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Done,
    Failed,
}

impl JobStatus {
    /// Whether the job has reached a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}
