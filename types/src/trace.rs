//! Reasoning trace records and their schema contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Required provenance tag; any other value is rejected outright.
pub const TRACE_SOURCE_SENTINEL: &str = "llm";

/// Inclusive confidence bounds a generated trace must declare.
pub const CONFIDENCE_MIN: f64 = 0.7;
pub const CONFIDENCE_MAX: f64 = 0.9;

/// The ten keys every trace file must carry.
pub const REQUIRED_TRACE_KEYS: [&str; 10] = [
    "task_id",
    "trace_source",
    "intended_model_family",
    "execution_model",
    "observations",
    "hypotheses",
    "rejected_hypotheses",
    "selected_rule",
    "step_plan",
    "confidence",
];

/// A hypothesis the generation model considered and discarded, with the
/// stated reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedHypothesis {
    pub hypothesis: String,
    pub reason: String,
}

/// A validated reasoning trace.
///
/// Produced once by an external generation call, validated through
/// [`ReasoningTrace::from_value`], and never mutated afterwards. Persisted as
/// one JSON object per task identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningTrace {
    pub task_id: String,
    pub trace_source: String,
    pub intended_model_family: String,
    pub execution_model: String,
    pub observations: Vec<String>,
    pub hypotheses: Vec<String>,
    pub rejected_hypotheses: Vec<RejectedHypothesis>,
    pub selected_rule: String,
    pub step_plan: Vec<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaViolation {
    #[error("trace is not a JSON object")]
    NotAnObject,
    #[error("missing required field(s): {}", fields.join(", "))]
    MissingFields { fields: Vec<String> },
    #[error("trace_source must be {TRACE_SOURCE_SENTINEL:?}, got {actual:?}")]
    WrongProvenance { actual: String },
    #[error("expected at least 2 hypotheses, got {actual}")]
    TooFewHypotheses { actual: usize },
    #[error("confidence {actual} outside [{CONFIDENCE_MIN}, {CONFIDENCE_MAX}]")]
    ConfidenceOutOfRange { actual: f64 },
    #[error("observation at index {index} is not a plain string")]
    StructuredObservation { index: usize },
    #[error("field '{field}' is malformed: {message}")]
    MalformedField { field: String, message: String },
}

impl ReasoningTrace {
    /// Validate a raw JSON value against the trace contract, then
    /// deserialize it.
    ///
    /// Checks run in contract order and the first failure is reported; the
    /// caller decides whether to discard or retry generation.
    pub fn from_value(value: &Value) -> Result<Self, SchemaViolation> {
        validate_trace(value)?;
        serde_json::from_value(value.clone()).map_err(|e| SchemaViolation::MalformedField {
            field: "trace".to_string(),
            message: e.to_string(),
        })
    }
}

fn field_as_array<'a>(object: &'a serde_json::Map<String, Value>, field: &str) -> Result<&'a Vec<Value>, SchemaViolation> {
    object
        .get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| SchemaViolation::MalformedField {
            field: field.to_string(),
            message: "expected a list".to_string(),
        })
}

/// Validate a raw trace value against the ten-key contract.
///
/// Check order: (1) required keys present, (2) provenance sentinel,
/// (3) hypothesis count, (4) confidence range, (5) observations are plain
/// strings. The last check exists specifically to catch a generation model
/// nesting metadata into what must be flat text.
pub fn validate_trace(value: &Value) -> Result<(), SchemaViolation> {
    let object = value.as_object().ok_or(SchemaViolation::NotAnObject)?;

    let missing: Vec<String> = REQUIRED_TRACE_KEYS
        .iter()
        .filter(|key| !object.contains_key(**key))
        .map(|key| (*key).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SchemaViolation::MissingFields { fields: missing });
    }

    let source = object
        .get("trace_source")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if source != TRACE_SOURCE_SENTINEL {
        return Err(SchemaViolation::WrongProvenance {
            actual: source.to_string(),
        });
    }

    let hypotheses = field_as_array(object, "hypotheses")?;
    if hypotheses.len() < 2 {
        return Err(SchemaViolation::TooFewHypotheses {
            actual: hypotheses.len(),
        });
    }

    let confidence = object
        .get("confidence")
        .and_then(Value::as_f64)
        .ok_or_else(|| SchemaViolation::MalformedField {
            field: "confidence".to_string(),
            message: "expected a number".to_string(),
        })?;
    if !(CONFIDENCE_MIN..=CONFIDENCE_MAX).contains(&confidence) {
        return Err(SchemaViolation::ConfidenceOutOfRange { actual: confidence });
    }

    let observations = field_as_array(object, "observations")?;
    for (index, observation) in observations.iter().enumerate() {
        if !observation.is_string() {
            return Err(SchemaViolation::StructuredObservation { index });
        }
    }

    Ok(())
}
