//! Merge-and-modify: turn selected issues into an instruction artifact or
//! an applied rewrite, with a bounded regeneration budget.
//!
//! `prompt` mode is stateless: one call, one reusable instruction string,
//! no budget. `apply` mode materializes a rewrite and may be regenerated a
//! capped number of times per request; the counter is attached to the
//! request, not the session, and resets only when a brand-new
//! selection/notes combination is submitted. A request past its budget is
//! rejected locally before any network call is attempted.
//!
//! Accepting a rewrite consumes the request and yields the rewritten text
//! as the new baseline for subsequent steps. This is the one place the
//! orchestrator mutates the content under analysis rather than its status.

use std::sync::Arc;

use tracing::{debug, info};

use proofstage_backend::{AnalysisBackend, MergeMode, MergeOutcome, RewriteResult};
use proofstage_config::MergeConfig;
use proofstage_utils::error::FlowError;
use proofstage_utils::types::Issue;

/// Maximum regenerations per apply-mode request, on top of the initial
/// generation.
pub const MAX_REGENERATE: u32 = 3;

/// A user-initiated batch operation over a subset of issues.
///
/// Lives only for the duration of the interaction; dropped on accept or on
/// navigating away.
#[derive(Debug)]
pub struct MergeModifyRequest {
    document_id: String,
    selected: Vec<Issue>,
    mode: MergeMode,
    notes: Option<String>,
    regenerate_count: u32,
    /// Budget the backend reported with the last rewrite, if any.
    last_reported_remaining: Option<u32>,
}

impl MergeModifyRequest {
    /// Build a request over a non-empty issue selection.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::ValidationFailed` for an empty selection; this
    /// is rejected before any call is attempted.
    pub fn new(
        document_id: impl Into<String>,
        selected: Vec<Issue>,
        mode: MergeMode,
        notes: Option<String>,
    ) -> Result<Self, FlowError> {
        if selected.is_empty() {
            return Err(FlowError::validation(
                "merge-modify requires at least one selected issue",
            ));
        }
        Ok(Self {
            document_id: document_id.into(),
            selected,
            mode,
            notes,
            regenerate_count: 0,
            last_reported_remaining: None,
        })
    }

    #[must_use]
    pub fn mode(&self) -> MergeMode {
        self.mode
    }

    #[must_use]
    pub fn regenerate_count(&self) -> u32 {
        self.regenerate_count
    }

    /// Accept a rewrite, consuming the request.
    ///
    /// Returns the rewritten text to feed back into the document as the
    /// new analysis baseline.
    #[must_use]
    pub fn accept(self, rewrite: RewriteResult) -> String {
        info!(
            document_id = %self.document_id,
            changes = rewrite.changes_count,
            "rewrite accepted as new baseline"
        );
        rewrite.modified_text
    }
}

/// Executes merge-modify requests against a backend with local budget
/// enforcement.
pub struct MergeModifyEngine {
    backend: Arc<dyn AnalysisBackend>,
    max_regenerate: u32,
}

impl MergeModifyEngine {
    #[must_use]
    pub fn new(backend: Arc<dyn AnalysisBackend>) -> Self {
        Self::with_max_regenerate(backend, MAX_REGENERATE)
    }

    /// Build an engine with the cap from the `merge` configuration table.
    #[must_use]
    pub fn new_from_config(backend: Arc<dyn AnalysisBackend>, config: &MergeConfig) -> Self {
        Self::with_max_regenerate(backend, config.max_regenerate)
    }

    /// Override the client-side regeneration cap (configuration knob).
    #[must_use]
    pub fn with_max_regenerate(backend: Arc<dyn AnalysisBackend>, max_regenerate: u32) -> Self {
        Self {
            backend,
            max_regenerate,
        }
    }

    /// Run the initial generation for a request.
    ///
    /// Prompt mode returns the instruction artifact and involves no budget.
    /// Apply mode returns the first rewrite and primes the budget from the
    /// backend's `remaining_attempts`.
    ///
    /// # Errors
    ///
    /// Propagates the backend's classified failure; `Transient` failures
    /// may simply be re-executed, no budget is consumed by failures.
    pub async fn execute(&self, request: &mut MergeModifyRequest) -> Result<MergeOutcome, FlowError> {
        let outcome = self
            .backend
            .merge_modify(
                &request.document_id,
                &request.selected,
                request.mode,
                request.notes.as_deref(),
            )
            .await?;

        if let MergeOutcome::Rewrite(rewrite) = &outcome {
            request.last_reported_remaining = Some(rewrite.remaining_attempts);
            debug!(
                remaining = rewrite.remaining_attempts,
                "apply-mode generation recorded"
            );
        }
        Ok(outcome)
    }

    /// Regenerate the rewrite for an apply-mode request.
    ///
    /// The budget check happens before any network call: a request that
    /// has exhausted either the client cap or the backend-reported
    /// remaining attempts fails fast with `BudgetExhausted`.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` for prompt-mode requests or before the initial
    ///   generation;
    /// - `BudgetExhausted` when the cap is reached (no call attempted);
    /// - backend failures otherwise, which do not consume budget.
    pub async fn regenerate(
        &self,
        request: &mut MergeModifyRequest,
    ) -> Result<RewriteResult, FlowError> {
        if request.mode != MergeMode::Apply {
            return Err(FlowError::validation(
                "regenerate only applies to apply-mode requests",
            ));
        }
        let Some(reported_remaining) = request.last_reported_remaining else {
            return Err(FlowError::validation(
                "regenerate requires an initial generation",
            ));
        };
        if request.regenerate_count >= self.max_regenerate || reported_remaining == 0 {
            return Err(FlowError::BudgetExhausted {
                max_regenerate: self.max_regenerate,
            });
        }

        let outcome = self
            .backend
            .merge_modify(
                &request.document_id,
                &request.selected,
                MergeMode::Apply,
                request.notes.as_deref(),
            )
            .await?;

        match outcome {
            MergeOutcome::Rewrite(rewrite) => {
                request.regenerate_count += 1;
                request.last_reported_remaining = Some(rewrite.remaining_attempts);
                debug!(
                    regenerate_count = request.regenerate_count,
                    remaining = rewrite.remaining_attempts,
                    "regeneration accepted"
                );
                Ok(rewrite)
            }
            MergeOutcome::Prompt(_) => Err(FlowError::transient(
                "backend returned an instruction artifact for an apply-mode request",
            )),
        }
    }
}
