//! Final prioritization table.

use sigfuse_core::{round_to, ConceptCandidate, PrioritizationRow};

/// Blend of feasibility and impact in `[0, 1]`, two decimals.
#[must_use]
pub fn confidence(feasibility: f64, impact: f64) -> f64 {
    round_to((impact + feasibility) / 20.0, 2)
}

/// One row per concept, in input order. No concepts is an empty table.
#[must_use]
pub fn assemble_scorecard(concepts: &[ConceptCandidate]) -> Vec<PrioritizationRow> {
    concepts
        .iter()
        .map(|c| PrioritizationRow {
            concept: c.name.clone(),
            feasibility: c.feasibility,
            impact: c.impact,
            confidence: confidence(c.feasibility, c.impact),
            concept_type: c.concept_type.clone(),
        })
        .collect()
}
