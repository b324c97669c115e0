//! Trace quality scoring.
//!
//! Scoring is a read-only view over a validated trace: four independent
//! sub-scores in `[0, 1]` combined into one scalar by unweighted mean.
//! The strategy seam exists so a future semantic scorer can be substituted
//! without touching the pipeline; the one shipped implementation is a
//! deliberately weak lexical proxy.

mod lexical;

use serde::Serialize;

use gridsmith_types::ReasoningTrace;

pub use lexical::{
    AssessmentDetail, ConsistencyDetail, GeneralizationDetail, HypothesisDetail, LexicalScorer,
    StructuralChecks,
};

/// Derived quality view over one trace. Recomputed on demand, never
/// persisted as authoritative state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityAssessment {
    pub structural: f64,
    pub generalization: f64,
    pub distinctness: f64,
    pub consistency: f64,
    /// Unweighted mean of the four sub-scores.
    pub combined: f64,
    /// At least one observation pins a literal NxM size without a relational
    /// keyword. Reported, never folded into the scores.
    pub over_specific_sizes: bool,
}

impl QualityAssessment {
    #[must_use]
    pub fn combine(
        structural: f64,
        generalization: f64,
        distinctness: f64,
        consistency: f64,
        over_specific_sizes: bool,
    ) -> Self {
        Self {
            structural,
            generalization,
            distinctness,
            consistency,
            combined: (structural + generalization + distinctness + consistency) / 4.0,
            over_specific_sizes,
        }
    }
}

/// A pure, deterministic scoring function over traces.
///
/// Implementations must be idempotent and must never mutate the trace.
pub trait ScoringStrategy: Send + Sync {
    fn assess(&self, trace: &ReasoningTrace) -> QualityAssessment;
}
