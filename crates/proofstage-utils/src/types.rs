use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Step identifiers for the staged document-analysis pipeline.
///
/// `StepId` represents the atomic units the flow controller schedules. Steps
/// execute in a defined order across five analysis layers, coarse to fine.
///
/// # Step Order
///
/// The pipeline progresses through steps in this order:
///
/// ```text
/// layer5-step1-1 → layer5-step1-2 → layer4-step2-0 → layer3-step3-0
///     → layer2-step4-0 → layer1-step5-0
/// ```
///
/// Layer 5 is the document layer; layer 1 is the lexical layer. A step may
/// only start once every lower-order step is completed or skipped; that
/// invariant is enforced by the flow controller, not here.
///
/// # Example
///
/// ```rust
/// use proofstage_utils::types::StepId;
///
/// let step = StepId::StructureScan;
/// assert_eq!(step.as_str(), "layer5-step1-1");
/// assert_eq!(step.layer(), 5);
/// assert_eq!(step.order(), 1);
/// ```
///
/// # Serialization
///
/// `StepId` serializes to its stable wire identifier (e.g.
/// `"layer5-step1-1"`), never to the Rust variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepId {
    /// Document-layer structure scan (layer 5, first sub-step).
    #[serde(rename = "layer5-step1-1")]
    StructureScan,
    /// Document-layer section flow check (layer 5, second sub-step).
    #[serde(rename = "layer5-step1-2")]
    SectionFlow,
    /// Section-layer connector analysis.
    #[serde(rename = "layer4-step2-0")]
    ConnectorAnalysis,
    /// Paragraph-layer fingerprint analysis.
    #[serde(rename = "layer3-step3-0")]
    FingerprintAnalysis,
    /// Sentence-layer rhythm analysis.
    #[serde(rename = "layer2-step4-0")]
    SentenceRhythm,
    /// Lexical-layer diversity analysis (final step).
    #[serde(rename = "layer1-step5-0")]
    LexicalDiversity,
}

impl StepId {
    /// Returns the stable wire identifier of the step.
    ///
    /// This is the canonical id used in session records, resume pointers,
    /// and backend calls.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StructureScan => "layer5-step1-1",
            Self::SectionFlow => "layer5-step1-2",
            Self::ConnectorAnalysis => "layer4-step2-0",
            Self::FingerprintAnalysis => "layer3-step3-0",
            Self::SentenceRhythm => "layer2-step4-0",
            Self::LexicalDiversity => "layer1-step5-0",
        }
    }

    /// Returns the analysis layer (5 = document, 1 = lexical).
    #[must_use]
    pub const fn layer(&self) -> u8 {
        match self {
            Self::StructureScan | Self::SectionFlow => 5,
            Self::ConnectorAnalysis => 4,
            Self::FingerprintAnalysis => 3,
            Self::SentenceRhythm => 2,
            Self::LexicalDiversity => 1,
        }
    }

    /// Returns the 1-based position of the step in the pipeline.
    ///
    /// The order is monotonic across the whole pipeline, not per layer.
    #[must_use]
    pub const fn order(&self) -> usize {
        match self {
            Self::StructureScan => 1,
            Self::SectionFlow => 2,
            Self::ConnectorAnalysis => 3,
            Self::FingerprintAnalysis => 4,
            Self::SentenceRhythm => 5,
            Self::LexicalDiversity => 6,
        }
    }

    /// Parse a canonical wire identifier. Returns `None` for anything else,
    /// including legacy ids; legacy handling lives in `proofstage-registry`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "layer5-step1-1" => Some(Self::StructureScan),
            "layer5-step1-2" => Some(Self::SectionFlow),
            "layer4-step2-0" => Some(Self::ConnectorAnalysis),
            "layer3-step3-0" => Some(Self::FingerprintAnalysis),
            "layer2-step4-0" => Some(Self::SentenceRhythm),
            "layer1-step5-0" => Some(Self::LexicalDiversity),
            _ => None,
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a single pipeline step within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not started yet.
    Pending,
    /// Analysis call in flight or awaiting a decision.
    InProgress,
    /// Confirmed by the caller (or auto-confirmed in autonomous mode).
    Completed,
    /// Explicitly skipped; the order cursor still advanced past it.
    Skipped,
}

impl StepStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
        }
    }

    /// Whether the step's order position is closed for the session.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

/// Execution strategy for a session.
///
/// The two modes are mutually exclusive for the lifetime of a session:
/// manual mode suspends before every step for an explicit decision, while
/// autonomous mode runs unattended after a one-time confirmation gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Manual,
    Autonomous,
}

impl SessionMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Autonomous => "autonomous",
        }
    }
}

/// Overall status of a session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Paused,
    Completed,
}

impl SessionStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

/// One run of the pipeline against one document.
///
/// Owned by the backend; the orchestrator reads and writes it exclusively
/// through the flow operations and mutates its local copy on every
/// transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub document_id: String,
    pub mode: SessionMode,
    pub current_step_id: String,
    pub status: SessionStatus,
}

/// Severity of a detected issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Risk classification returned alongside each step's analysis result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Half-open character range an issue applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

/// A problem surfaced by a step's analysis collaborator.
///
/// Issues are immutable once returned; the merge-modify engine consumes
/// them but never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Stable identifier assigned by the backend, used for selection.
    pub id: String,
    /// Detector-specific type tag (e.g. `"connector_overuse"`).
    #[serde(rename = "type")]
    pub issue_type: String,
    pub severity: Severity,
    pub description_zh: String,
    pub description_en: String,
    #[serde(default)]
    pub affected_positions: Vec<TextSpan>,
}

/// Action an executor took for a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Confirm,
    Skip,
}

impl DecisionAction {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Skip => "skip",
        }
    }
}

/// One entry in the autonomous executor's append-only decision log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoDecision {
    pub step_id: StepId,
    pub action: DecisionAction,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Advisory progress snapshot derived from local step records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub skipped: usize,
    pub total: usize,
    pub percent: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_ids_round_trip_through_wire_identifiers() {
        for step in [
            StepId::StructureScan,
            StepId::SectionFlow,
            StepId::ConnectorAnalysis,
            StepId::FingerprintAnalysis,
            StepId::SentenceRhythm,
            StepId::LexicalDiversity,
        ] {
            assert_eq!(StepId::parse(step.as_str()), Some(step));
        }
        assert_eq!(StepId::parse("step1-1"), None);
        assert_eq!(StepId::parse(""), None);
    }

    #[test]
    fn step_order_is_strictly_increasing_across_layers() {
        let steps = [
            StepId::StructureScan,
            StepId::SectionFlow,
            StepId::ConnectorAnalysis,
            StepId::FingerprintAnalysis,
            StepId::SentenceRhythm,
            StepId::LexicalDiversity,
        ];
        for pair in steps.windows(2) {
            assert!(pair[0].order() < pair[1].order());
            assert!(pair[0].layer() >= pair[1].layer());
        }
    }

    #[test]
    fn step_id_serializes_to_wire_identifier() {
        let json = serde_json::to_string(&StepId::SectionFlow).unwrap();
        assert_eq!(json, "\"layer5-step1-2\"");
        let back: StepId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, StepId::SectionFlow);
    }

    #[test]
    fn settled_statuses() {
        assert!(StepStatus::Completed.is_settled());
        assert!(StepStatus::Skipped.is_settled());
        assert!(!StepStatus::Pending.is_settled());
        assert!(!StepStatus::InProgress.is_settled());
    }

    #[test]
    fn mode_and_status_strings_are_snake_case() {
        assert_eq!(SessionMode::Autonomous.as_str(), "autonomous");
        assert_eq!(SessionStatus::Active.as_str(), "active");
        assert_eq!(
            serde_json::to_string(&StepStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }
}
