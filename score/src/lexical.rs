//! Keyword-matching quality heuristics.
//!
//! Every score here is a lexical proxy computed from fixed hand-picked
//! lexicons. The lexicons can both over- and under-match and there is no
//! ground truth for "correct" classification, so tests assert the stated
//! arithmetic, not semantic correctness.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use gridsmith_types::{CONFIDENCE_MAX, CONFIDENCE_MIN, ReasoningTrace};

use crate::{QualityAssessment, ScoringStrategy};

/// Observations phrased in terms of relationships rather than fixed sizes.
const RELATIONAL_KEYWORDS: [&str; 6] = ["ratio", "factor", "proportional", "relative", "scaled", "times"];

/// Observations that pin concrete sizes or absolutes (diagnostic counts only).
const ABSOLUTE_KEYWORDS: [&str; 6] = ["2x2", "3x3", "6x6", "always", "is always", "exactly"];

/// Words indicating a rejection reason cites specifics (diagnostic only).
const CONCRETENESS_KEYWORDS: [&str; 6] = ["example", "shows", "produces", "actual", "training", "would produce"];

fn size_token_regex() -> &'static Regex {
    static SIZE: OnceLock<Regex> = OnceLock::new();
    SIZE.get_or_init(|| Regex::new(r"\d+x\d+").expect("size regex is valid"))
}

/// The six binary structural completeness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StructuralChecks {
    pub has_observations: bool,
    pub has_multiple_hypotheses: bool,
    pub has_rejected_hypotheses: bool,
    pub has_selected_rule: bool,
    pub has_step_plan: bool,
    pub confidence_in_range: bool,
}

impl StructuralChecks {
    pub const TOTAL: usize = 6;

    #[must_use]
    pub fn of(trace: &ReasoningTrace) -> Self {
        Self {
            has_observations: !trace.observations.is_empty(),
            has_multiple_hypotheses: trace.hypotheses.len() >= 2,
            has_rejected_hypotheses: !trace.rejected_hypotheses.is_empty(),
            has_selected_rule: !trace.selected_rule.trim().is_empty(),
            has_step_plan: !trace.step_plan.is_empty(),
            confidence_in_range: (CONFIDENCE_MIN..=CONFIDENCE_MAX).contains(&trace.confidence),
        }
    }

    #[must_use]
    pub fn passed(&self) -> usize {
        [
            self.has_observations,
            self.has_multiple_hypotheses,
            self.has_rejected_hypotheses,
            self.has_selected_rule,
            self.has_step_plan,
            self.confidence_in_range,
        ]
        .iter()
        .filter(|check| **check)
        .count()
    }

    /// Fraction of checks satisfied; increments of 1/6.
    #[must_use]
    pub fn score(&self) -> f64 {
        self.passed() as f64 / Self::TOTAL as f64
    }
}

/// Relational-vs-absolute observation breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneralizationDetail {
    pub relational_observations: usize,
    pub absolute_observations: usize,
    /// Some observation carries a literal NxM token with no relational
    /// keyword next to it: over-specific, non-generalizing phrasing.
    pub has_absolute_sizes: bool,
    pub score: f64,
}

impl GeneralizationDetail {
    #[must_use]
    pub fn of(trace: &ReasoningTrace) -> Self {
        let lowered: Vec<String> = trace
            .observations
            .iter()
            .map(|obs| obs.to_lowercase())
            .collect();

        let relational = lowered
            .iter()
            .filter(|obs| RELATIONAL_KEYWORDS.iter().any(|kw| obs.contains(kw)))
            .count();
        let absolute = lowered
            .iter()
            .filter(|obs| ABSOLUTE_KEYWORDS.iter().any(|kw| obs.contains(kw)))
            .count();
        let has_absolute_sizes = lowered.iter().any(|obs| {
            size_token_regex().is_match(obs)
                && !RELATIONAL_KEYWORDS.iter().any(|kw| obs.contains(kw))
        });

        Self {
            relational_observations: relational,
            absolute_observations: absolute,
            has_absolute_sizes,
            score: relational as f64 / trace.observations.len().max(1) as f64,
        }
    }
}

/// Hypothesis distinctness and rejection-quality breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HypothesisDetail {
    pub num_hypotheses: usize,
    pub num_rejected: usize,
    pub avg_distinctness: f64,
    pub rejection_concreteness: f64,
    pub all_rejections_concrete: bool,
}

impl HypothesisDetail {
    #[must_use]
    pub fn of(trace: &ReasoningTrace) -> Self {
        let concrete: Vec<bool> = trace
            .rejected_hypotheses
            .iter()
            .map(|rejected| {
                let reason = rejected.reason.to_lowercase();
                CONCRETENESS_KEYWORDS.iter().any(|kw| reason.contains(kw))
            })
            .collect();
        let concrete_count = concrete.iter().filter(|c| **c).count();

        Self {
            num_hypotheses: trace.hypotheses.len(),
            num_rejected: trace.rejected_hypotheses.len(),
            avg_distinctness: distinctness_score(&trace.hypotheses),
            rejection_concreteness: concrete_count as f64 / concrete.len().max(1) as f64,
            all_rejections_concrete: concrete.iter().all(|c| *c),
        }
    }
}

/// Rule/plan and rule/observation word-overlap breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsistencyDetail {
    pub rule_plan_overlap: f64,
    pub rule_observation_overlap: f64,
}

impl ConsistencyDetail {
    #[must_use]
    pub fn of(trace: &ReasoningTrace) -> Self {
        let rule = trace.selected_rule.to_lowercase();
        let plan = trace.step_plan.join(" ").to_lowercase();
        let observations = trace.observations.join(" ").to_lowercase();

        let rule_words = word_set(&rule);
        let plan_words = word_set(&plan);
        let obs_words = word_set(&observations);

        Self {
            rule_plan_overlap: containment(&rule_words, &plan_words),
            rule_observation_overlap: containment(&rule_words, &obs_words),
        }
    }

    /// Mean of the two overlap ratios.
    #[must_use]
    pub fn score(&self) -> f64 {
        (self.rule_plan_overlap + self.rule_observation_overlap) / 2.0
    }
}

/// Full diagnostic breakdown behind one assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentDetail {
    pub structural: StructuralChecks,
    pub generalization: GeneralizationDetail,
    pub hypotheses: HypothesisDetail,
    pub consistency: ConsistencyDetail,
}

fn word_set(text: &str) -> HashSet<&str> {
    text.split_whitespace().collect()
}

/// `|reference ∩ other| / |reference|`, 0 when the reference is empty.
fn containment(reference: &HashSet<&str>, other: &HashSet<&str>) -> f64 {
    let shared = reference.intersection(other).count();
    shared as f64 / reference.len().max(1) as f64
}

/// Mean pairwise bag-of-words distinctness, `1 − |∩|/|∪|` per unordered
/// pair; vacuously 1.0 below two hypotheses.
fn distinctness_score(hypotheses: &[String]) -> f64 {
    let lowered: Vec<String> = hypotheses.iter().map(|h| h.to_lowercase()).collect();
    let word_sets: Vec<HashSet<&str>> = lowered.iter().map(|h| word_set(h)).collect();

    let mut pair_scores = Vec::new();
    for i in 0..word_sets.len() {
        for j in (i + 1)..word_sets.len() {
            let intersection = word_sets[i].intersection(&word_sets[j]).count();
            let union = word_sets[i].union(&word_sets[j]).count();
            let overlap = intersection as f64 / union.max(1) as f64;
            pair_scores.push(1.0 - overlap);
        }
    }

    if pair_scores.is_empty() {
        1.0
    } else {
        pair_scores.iter().sum::<f64>() / pair_scores.len() as f64
    }
}

/// The shipped keyword-matching scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalScorer;

impl LexicalScorer {
    /// Full diagnostic breakdown; the combined assessment uses only the
    /// four sub-scores derived from this.
    #[must_use]
    pub fn detail(&self, trace: &ReasoningTrace) -> AssessmentDetail {
        AssessmentDetail {
            structural: StructuralChecks::of(trace),
            generalization: GeneralizationDetail::of(trace),
            hypotheses: HypothesisDetail::of(trace),
            consistency: ConsistencyDetail::of(trace),
        }
    }
}

impl ScoringStrategy for LexicalScorer {
    fn assess(&self, trace: &ReasoningTrace) -> QualityAssessment {
        let detail = self.detail(trace);
        QualityAssessment::combine(
            detail.structural.score(),
            detail.generalization.score,
            detail.hypotheses.avg_distinctness,
            detail.consistency.score(),
            detail.generalization.has_absolute_sizes,
        )
    }
}
