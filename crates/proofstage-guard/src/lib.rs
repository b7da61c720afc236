//! Invocation idempotency guard with advisory in-memory semantics.
//!
//! Step-initiation call sites are vulnerable to duplicate triggering from
//! the calling environment (double effect execution, re-renders, impatient
//! users). The guard turns that hazard into an explicit invariant: at most
//! one in-flight analysis invocation per `(document, step)` pair, and no
//! re-invocation at all once the pair has been marked done.
//!
//! Entries are never evicted within the guard's lifetime. A completed step
//! must not silently re-run; re-analyzing a document requires a new session
//! and with it a new guard. The guard is scoped to one session/document
//! pair's process lifetime, not shared across sessions.

use std::collections::HashSet;
use std::sync::Mutex;

use proofstage_utils::types::StepId;
use tracing::debug;

#[derive(Debug, Default)]
struct GuardState {
    in_flight: HashSet<(String, StepId)>,
    done: HashSet<(String, StepId)>,
}

/// At-most-once invocation guard keyed by `(document_id, step_id)`.
#[derive(Debug, Default)]
pub struct InvocationGuard {
    state: Mutex<GuardState>,
}

impl InvocationGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request permission to invoke the analysis call for a pair.
    ///
    /// Returns `true` exactly once per pair until [`release`](Self::release)
    /// is called; returns `false` while an invocation is in flight and
    /// forever after [`mark_done`](Self::mark_done).
    pub fn try_enter(&self, document_id: &str, step: StepId) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let key = (document_id.to_string(), step);
        if state.done.contains(&key) {
            debug!(document_id, step = %step, "invocation rejected: already done");
            return false;
        }
        if state.in_flight.contains(&key) {
            debug!(document_id, step = %step, "invocation rejected: in flight");
            return false;
        }
        state.in_flight.insert(key);
        true
    }

    /// Record that the pair's invocation resolved successfully.
    ///
    /// The pair is closed for the guard's lifetime; any later `try_enter`
    /// returns `false`.
    pub fn mark_done(&self, document_id: &str, step: StepId) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let key = (document_id.to_string(), step);
        state.in_flight.remove(&key);
        state.done.insert(key);
    }

    /// Release an in-flight entry after a failed invocation.
    ///
    /// A step that never reached done stays retryable, so failure paths
    /// must release the slot they entered.
    pub fn release(&self, document_id: &str, step: StepId) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.in_flight.remove(&(document_id.to_string(), step));
    }

    /// Whether the pair has been marked done.
    #[must_use]
    pub fn is_done(&self, document_id: &str, step: StepId) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.done.contains(&(document_id.to_string(), step))
    }
}
