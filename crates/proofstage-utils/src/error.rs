use thiserror::Error;

/// Error taxonomy for orchestration operations.
///
/// `FlowError` is the typed result surface of the flow controller, the
/// merge-modify engine, and the backend collaborators. Errors never escape
/// the orchestrator's public contract as panics or raw transport errors;
/// every failure is classified into one of these variants.
///
/// # Categories
///
/// | Variant | Scope | Recovery |
/// |---------|-------|----------|
/// | `NotFound` | terminal | none; start over |
/// | `ValidationFailed` | rejected before any call | fix the request |
/// | `Transient` | retryable | `retry` / `regenerate` within budget |
/// | `BudgetExhausted` | terminal for one merge-modify request | new request |
/// | `InvalidTransition` | caller bug | none |
///
/// The variants carry owned strings only, so the error is `Clone` and can
/// be held inside the flow controller's `Error` state while the caller
/// decides between retry and abort.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// Document or session missing on the backend. Terminal; the only path
    /// forward is starting a new session.
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// Malformed request rejected before any network call was attempted.
    #[error("validation failed: {reason}")]
    ValidationFailed { reason: String },

    /// Network failure, timeout, or collaborator 5xx. Eligible for `retry`
    /// in the `Error` state and for `regenerate` within the budget.
    #[error("transient backend failure: {reason}")]
    Transient { reason: String },

    /// Regeneration cap reached for one merge-modify request. Terminal for
    /// that request only, never for the session.
    #[error("regeneration budget exhausted after {max_regenerate} attempts")]
    BudgetExhausted { max_regenerate: u32 },

    /// A state-machine operation was requested from a state that does not
    /// permit it (e.g. `decide` while no step awaits a decision).
    #[error("invalid transition: {operation} not permitted in state {state}")]
    InvalidTransition {
        operation: &'static str,
        state: String,
    },
}

impl FlowError {
    /// Whether a retry of the same operation may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    #[must_use]
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::ValidationFailed {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient {
            reason: reason.into(),
        }
    }
}

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found at {path}")]
    FileNotFound { path: String },

    #[error("failed to read config file {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Workspace-level error type aggregating every proofstage failure class.
///
/// Library consumers that do not care which subsystem failed can match on
/// this; components internally return their specific error type.
#[derive(Error, Debug)]
pub enum ProofstageError {
    #[error("flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_is_the_only_retryable_class() {
        assert!(FlowError::transient("socket reset").is_transient());
        assert!(!FlowError::validation("empty selection").is_transient());
        assert!(!FlowError::NotFound {
            resource: "document",
            id: "doc-1".into(),
        }
        .is_transient());
        assert!(!FlowError::BudgetExhausted { max_regenerate: 3 }.is_transient());
    }

    #[test]
    fn errors_format_with_context() {
        let err = FlowError::NotFound {
            resource: "session",
            id: "sess-42".into(),
        };
        assert_eq!(err.to_string(), "session not found: sess-42");

        let err = FlowError::BudgetExhausted { max_regenerate: 3 };
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn workspace_error_wraps_flow_error() {
        let err: ProofstageError = FlowError::validation("bad").into();
        assert!(matches!(err, ProofstageError::Flow(_)));
    }
}
