//! Ground-truth task records and verification reports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::grid::Grid;

/// One verified input/output example pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPair {
    pub input: Grid,
    pub output: Grid,
}

/// A test example with the output withheld.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestInput {
    pub input: Grid,
}

/// Ground truth for one task: the acceptance oracle for verification.
/// Read-only; never written by this pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskData {
    pub train: Vec<GridPair>,
    #[serde(default)]
    pub test: Vec<TestInput>,
}

/// The full ground-truth source: task identifier to task data.
pub type GroundTruth = BTreeMap<String, TaskData>;

/// Per-example diagnostic from testing a candidate program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExampleOutcome {
    Match,
    Mismatch,
    Timeout,
    Exception { kind: String, message: String },
    NoOutput,
}

impl ExampleOutcome {
    #[must_use]
    pub const fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }
}

/// Definite accept/reject for one task, with per-example breakdown.
///
/// `success_count / total` is a diagnostic ratio only; acceptance always
/// requires every example to match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskVerdict {
    pub task_id: String,
    pub accepted: bool,
    pub success_count: usize,
    pub total: usize,
    pub examples: Vec<ExampleOutcome>,
    /// Task-level failure (schema or synthesis contract) that prevented
    /// testing; recorded instead of thrown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskVerdict {
    /// A verdict for a task that failed before any example could run.
    #[must_use]
    pub fn failed(task_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            accepted: false,
            success_count: 0,
            total: 0,
            examples: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Aggregate result of a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub generated_at: String,
    pub total_tasks: usize,
    pub passed: usize,
    pub verdicts: Vec<TaskVerdict>,
}
