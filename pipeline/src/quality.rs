//! Quality assessment over a directory of persisted traces.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use gridsmith_score::{QualityAssessment, ScoringStrategy};

use crate::store::{StoreError, TraceStore};

/// Per-id assessments plus the directory-wide average.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryAssessment {
    pub individual: BTreeMap<String, QualityAssessment>,
    pub average_score: f64,
    pub num_traces: usize,
    /// Traces that failed schema validation, with the failure text; they do
    /// not contribute to the average.
    pub invalid: BTreeMap<String, String>,
}

/// Score every trace file in `dir` with the given strategy.
pub fn assess_directory(
    dir: &Path,
    scorer: &dyn ScoringStrategy,
) -> Result<DirectoryAssessment, StoreError> {
    let store = TraceStore::new(dir);
    let mut individual = BTreeMap::new();
    let mut invalid = BTreeMap::new();

    for task_id in store.list_ids()? {
        match store.load(&task_id) {
            Ok(trace) => {
                individual.insert(task_id, scorer.assess(&trace));
            }
            Err(e) => {
                tracing::warn!(task_id, "trace failed validation: {e}");
                invalid.insert(task_id, e.to_string());
            }
        }
    }

    let num_traces = individual.len();
    let average_score = if num_traces == 0 {
        0.0
    } else {
        individual.values().map(|a| a.combined).sum::<f64>() / num_traces as f64
    };

    Ok(DirectoryAssessment {
        individual,
        average_score,
        num_traces,
        invalid,
    })
}

#[cfg(test)]
mod tests {
    use super::assess_directory;
    use crate::store::TraceStore;
    use gridsmith_score::LexicalScorer;
    use gridsmith_types::ReasoningTrace;
    use serde_json::json;

    fn trace(task_id: &str) -> ReasoningTrace {
        ReasoningTrace::from_value(&json!({
            "task_id": task_id,
            "trace_source": "llm",
            "intended_model_family": "gemini-flash",
            "execution_model": "gemini-3-flash-preview",
            "observations": ["output scaled relative to input"],
            "hypotheses": ["tile the input", "rotate clockwise"],
            "rejected_hypotheses": [
                {"hypothesis": "rotate clockwise", "reason": "example 1 shows tiling"}
            ],
            "selected_rule": "tile the input",
            "step_plan": ["tile the input"],
            "confidence": 0.8
        }))
        .unwrap()
    }

    #[test]
    fn assesses_every_valid_trace_and_averages() {
        let dir = tempfile::tempdir().unwrap();
        let store = TraceStore::new(dir.path());
        store.save(&trace("a1")).unwrap();
        store.save(&trace("a2")).unwrap();

        let result = assess_directory(dir.path(), &LexicalScorer).unwrap();
        assert_eq!(result.num_traces, 2);
        assert!(result.invalid.is_empty());
        let a1 = result.individual["a1"].combined;
        assert_eq!(result.average_score, (a1 + result.individual["a2"].combined) / 2.0);
    }

    #[test]
    fn invalid_traces_are_reported_not_scored() {
        let dir = tempfile::tempdir().unwrap();
        let store = TraceStore::new(dir.path());
        store.save(&trace("good")).unwrap();
        std::fs::write(
            dir.path().join("bad.json"),
            json!({"task_id": "bad", "trace_source": "human"}).to_string(),
        )
        .unwrap();

        let result = assess_directory(dir.path(), &LexicalScorer).unwrap();
        assert_eq!(result.num_traces, 1);
        assert!(result.invalid.contains_key("bad"));
    }

    #[test]
    fn empty_directory_has_zero_average() {
        let dir = tempfile::tempdir().unwrap();
        let result = assess_directory(dir.path(), &LexicalScorer).unwrap();
        assert_eq!(result.num_traces, 0);
        assert_eq!(result.average_score, 0.0);
    }
}
