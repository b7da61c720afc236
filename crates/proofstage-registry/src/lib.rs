//! Static, ordered catalog of pipeline steps.
//!
//! The registry is the single source of truth for which steps exist, their
//! layer, and their position in the pipeline. It also maps legacy step
//! identifiers from the previous four-stage numbering onto the current
//! five-layer scheme so old session records remain resumable.
//!
//! The registry is pure and stateless: a const table plus total lookup
//! functions. The only soft failure mode is an unrecognized raw id, which
//! canonicalizes to the first step of the pipeline and is logged at `warn`
//! because it usually indicates a broken resume pointer upstream.

use serde::Serialize;
use tracing::warn;

use proofstage_utils::types::StepId;

/// One entry in the ordered pipeline catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepSpec {
    pub id: StepId,
    /// Analysis layer, 5 (document) down to 1 (lexical).
    pub layer: u8,
    /// 1-based monotonic position across the whole pipeline.
    pub order: usize,
    /// Human-readable label for status surfaces.
    pub title: &'static str,
}

/// The canonical pipeline, in execution order.
const PIPELINE: [StepSpec; 6] = [
    StepSpec {
        id: StepId::StructureScan,
        layer: 5,
        order: 1,
        title: "Document structure scan",
    },
    StepSpec {
        id: StepId::SectionFlow,
        layer: 5,
        order: 2,
        title: "Section flow check",
    },
    StepSpec {
        id: StepId::ConnectorAnalysis,
        layer: 4,
        order: 3,
        title: "Connector analysis",
    },
    StepSpec {
        id: StepId::FingerprintAnalysis,
        layer: 3,
        order: 4,
        title: "Paragraph fingerprint analysis",
    },
    StepSpec {
        id: StepId::SentenceRhythm,
        layer: 2,
        order: 5,
        title: "Sentence rhythm analysis",
    },
    StepSpec {
        id: StepId::LexicalDiversity,
        layer: 1,
        order: 6,
        title: "Lexical diversity analysis",
    },
];

/// Returns the full pipeline in ascending execution order.
#[must_use]
pub const fn ordered() -> &'static [StepSpec] {
    &PIPELINE
}

/// Returns the first step of the pipeline.
#[must_use]
pub const fn first() -> StepId {
    PIPELINE[0].id
}

/// Returns the catalog entry for a step.
#[must_use]
pub fn spec_for(id: StepId) -> &'static StepSpec {
    // The catalog is total over StepId by construction.
    PIPELINE
        .iter()
        .find(|spec| spec.id == id)
        .unwrap_or(&PIPELINE[0])
}

/// Returns the step following `id`, or `None` when `id` is the last step.
#[must_use]
pub fn next_after(id: StepId) -> Option<StepId> {
    let pos = PIPELINE.iter().position(|spec| spec.id == id)?;
    PIPELINE.get(pos + 1).map(|spec| spec.id)
}

/// Map a raw step identifier, canonical or legacy, onto the current scheme.
///
/// Legacy identifiers come from the prior four-stage numbering
/// (`step1-1`, `step1-2`, `level2`, `level3`); persisted session records
/// written under that scheme must keep resuming after an upgrade.
///
/// Total: anything unrecognized resolves to the first step of the pipeline.
/// The fallback is logged at `warn`, never silently swallowed, because an
/// unknown id in a session record masks a resumption bug.
#[must_use]
pub fn canonicalize(raw: &str) -> StepId {
    if let Some(id) = StepId::parse(raw) {
        return id;
    }
    if let Some(id) = legacy_lookup(raw) {
        return id;
    }
    warn!(raw_step_id = raw, "unrecognized step id, defaulting to first step");
    first()
}

fn legacy_lookup(raw: &str) -> Option<StepId> {
    match raw {
        "step1-1" => Some(StepId::StructureScan),
        "step1-2" => Some(StepId::ConnectorAnalysis),
        "level2" => Some(StepId::FingerprintAnalysis),
        "level3" => Some(StepId::SentenceRhythm),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_order_is_monotonic_and_layers_descend() {
        let steps = ordered();
        assert_eq!(steps.len(), 6);
        for pair in steps.windows(2) {
            assert!(pair[0].order < pair[1].order);
            assert!(pair[0].layer >= pair[1].layer);
        }
        assert_eq!(steps[0].id, first());
    }

    #[test]
    fn next_after_walks_the_whole_pipeline() {
        let mut current = Some(first());
        let mut visited = Vec::new();
        while let Some(step) = current {
            visited.push(step);
            current = next_after(step);
        }
        assert_eq!(visited.len(), ordered().len());
        assert_eq!(visited.last().copied(), Some(StepId::LexicalDiversity));
        assert_eq!(next_after(StepId::LexicalDiversity), None);
    }

    #[test]
    fn canonical_ids_pass_through() {
        for spec in ordered() {
            assert_eq!(canonicalize(spec.id.as_str()), spec.id);
        }
    }

    #[test]
    fn legacy_ids_map_onto_five_layer_scheme() {
        assert_eq!(canonicalize("step1-1"), StepId::StructureScan);
        assert_eq!(canonicalize("step1-2"), StepId::ConnectorAnalysis);
        assert_eq!(canonicalize("level2"), StepId::FingerprintAnalysis);
        assert_eq!(canonicalize("level3"), StepId::SentenceRhythm);
    }

    #[test]
    fn unknown_ids_default_to_first_step() {
        assert_eq!(canonicalize(""), first());
        assert_eq!(canonicalize("layer9-step9-9"), first());
        assert_eq!(canonicalize("not-a-step"), first());
    }

    #[test]
    fn spec_for_is_total() {
        for spec in ordered() {
            assert_eq!(spec_for(spec.id).id, spec.id);
        }
        assert_eq!(spec_for(StepId::SectionFlow).layer, 5);
    }
}
