//! Scriptable in-memory backend for tests.
//!
//! Not part of the public API stability guarantees; enabled by the
//! `test-utils` feature so downstream crates can exercise the orchestrator
//! without a network.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use proofstage_registry::{first, next_after};
use proofstage_utils::error::FlowError;
use proofstage_utils::types::{
    Issue, Session, SessionMode, SessionStatus, Severity, StepId, TextSpan,
};

use crate::types::{
    AnalysisOutcome, FlowStartResponse, JobStatus, MergeMode, MergeOutcome, PromptArtifact,
    RewriteResult, SessionProgress, StepResultPayload,
};
use crate::AnalysisBackend;

/// Total apply-mode attempts the simulated backend grants per selection,
/// initial generation included.
const MOCK_TOTAL_APPLY_ATTEMPTS: u32 = 3;

#[derive(Debug, Default)]
struct MockState {
    analyze_calls: Vec<(String, StepId)>,
    merge_calls: u32,
    apply_calls: u32,
    analyze_failures: VecDeque<FlowError>,
    merge_failures: VecDeque<FlowError>,
    progress_script: VecDeque<SessionProgress>,
    job_script: VecDeque<JobStatus>,
    missing_documents: HashSet<String>,
    sessions_started: u32,
    issues_per_step: usize,
}

/// In-memory [`AnalysisBackend`] with call recording and failure injection.
#[derive(Debug)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                issues_per_step: 2,
                ..MockState::default()
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a failure for the next `analyze_step` call.
    pub fn fail_next_analyze(&self, err: FlowError) {
        self.lock().analyze_failures.push_back(err);
    }

    /// Queue a failure for the next `merge_modify` call.
    pub fn fail_next_merge(&self, err: FlowError) {
        self.lock().merge_failures.push_back(err);
    }

    /// Make a document id resolve to `NotFound` everywhere.
    pub fn forget_document(&self, document_id: &str) {
        self.lock().missing_documents.insert(document_id.to_string());
    }

    /// Script the sequence of `session_progress` responses. After the
    /// script drains, a completed 100% report repeats.
    pub fn script_progress(&self, reports: impl IntoIterator<Item = SessionProgress>) {
        self.lock().progress_script.extend(reports);
    }

    /// Script the sequence of `job_status` responses. After the script
    /// drains, `Pending` repeats.
    pub fn script_jobs(&self, statuses: impl IntoIterator<Item = JobStatus>) {
        self.lock().job_script.extend(statuses);
    }

    /// How many issues each analysis result carries (default 2).
    pub fn set_issues_per_step(&self, count: usize) {
        self.lock().issues_per_step = count;
    }

    /// Number of `analyze_step` calls that reached the backend.
    #[must_use]
    pub fn analyze_call_count(&self) -> usize {
        self.lock().analyze_calls.len()
    }

    /// The `(document_id, step)` pairs analyzed, in call order.
    #[must_use]
    pub fn analyze_calls(&self) -> Vec<(String, StepId)> {
        self.lock().analyze_calls.clone()
    }

    /// Number of `merge_modify` calls that reached the backend.
    #[must_use]
    pub fn merge_call_count(&self) -> u32 {
        self.lock().merge_calls
    }

    fn issue(step: StepId, index: usize) -> Issue {
        Issue {
            id: format!("{}-issue-{index}", step.as_str()),
            issue_type: "connector_overuse".to_string(),
            severity: if index % 2 == 0 {
                Severity::Medium
            } else {
                Severity::Low
            },
            description_zh: "连接词使用过于规律".to_string(),
            description_en: "Connector usage is unusually regular".to_string(),
            affected_positions: vec![TextSpan {
                start: index * 40,
                end: index * 40 + 12,
            }],
        }
    }

    fn session_after(&self, session_id: &str, step: StepId) -> Session {
        let (current, status) = match next_after(step) {
            Some(next) => (next.as_str().to_string(), SessionStatus::Active),
            None => (step.as_str().to_string(), SessionStatus::Completed),
        };
        Session {
            session_id: session_id.to_string(),
            document_id: "doc-under-analysis".to_string(),
            mode: SessionMode::Manual,
            current_step_id: current,
            status,
        }
    }
}

#[async_trait]
impl AnalysisBackend for MockBackend {
    async fn analyze_step(
        &self,
        document_id: &str,
        step: StepId,
        _session_id: Option<&str>,
    ) -> Result<AnalysisOutcome, FlowError> {
        let mut state = self.lock();
        if state.missing_documents.contains(document_id) {
            return Err(FlowError::NotFound {
                resource: "document",
                id: document_id.to_string(),
            });
        }
        if let Some(err) = state.analyze_failures.pop_front() {
            return Err(err);
        }
        state
            .analyze_calls
            .push((document_id.to_string(), step));
        let issues = (0..state.issues_per_step)
            .map(|i| Self::issue(step, i))
            .collect();
        Ok(AnalysisOutcome {
            issues,
            score: 72.5,
            risk_level: proofstage_utils::types::RiskLevel::Medium,
            recommendations: vec!["Vary sentence openings".to_string()],
        })
    }

    async fn merge_modify(
        &self,
        _document_id: &str,
        issues: &[Issue],
        mode: MergeMode,
        notes: Option<&str>,
    ) -> Result<MergeOutcome, FlowError> {
        let mut state = self.lock();
        if let Some(err) = state.merge_failures.pop_front() {
            return Err(err);
        }
        state.merge_calls += 1;
        match mode {
            MergeMode::Prompt => Ok(MergeOutcome::Prompt(PromptArtifact {
                instructions: format!(
                    "Address {} selected issue(s).{}",
                    issues.len(),
                    notes.map(|n| format!(" Notes: {n}")).unwrap_or_default()
                ),
            })),
            MergeMode::Apply => {
                state.apply_calls += 1;
                let remaining = MOCK_TOTAL_APPLY_ATTEMPTS.saturating_sub(state.apply_calls);
                Ok(MergeOutcome::Rewrite(RewriteResult {
                    modified_text: format!("rewritten text, pass {}", state.apply_calls),
                    changes_summary: format!("addressed {} issue(s)", issues.len()),
                    changes_count: issues.len() as u32,
                    remaining_attempts: remaining,
                }))
            }
        }
    }

    async fn flow_start(
        &self,
        document_id: &str,
        mode: SessionMode,
    ) -> Result<FlowStartResponse, FlowError> {
        let mut state = self.lock();
        if state.missing_documents.contains(document_id) {
            return Err(FlowError::NotFound {
                resource: "document",
                id: document_id.to_string(),
            });
        }
        state.sessions_started += 1;
        let _ = mode;
        Ok(FlowStartResponse {
            session_id: format!("sess-{}", state.sessions_started),
            current_step: first().as_str().to_string(),
        })
    }

    async fn flow_complete_level(
        &self,
        session_id: &str,
        result: &StepResultPayload,
    ) -> Result<Session, FlowError> {
        Ok(self.session_after(session_id, result.step_id))
    }

    async fn flow_skip_level(
        &self,
        session_id: &str,
        step: StepId,
    ) -> Result<Session, FlowError> {
        Ok(self.session_after(session_id, step))
    }

    async fn session_progress(&self, session_id: &str) -> Result<SessionProgress, FlowError> {
        let _ = session_id;
        let mut state = self.lock();
        Ok(state.progress_script.pop_front().unwrap_or(SessionProgress {
            status: SessionStatus::Completed,
            percent_complete: 100,
        }))
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus, FlowError> {
        let _ = job_id;
        let mut state = self.lock();
        Ok(state.job_script.pop_front().unwrap_or(JobStatus::Pending))
    }
}
