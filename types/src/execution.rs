//! The executor's result contract.

use std::time::Duration;

/// Outcome of one sandboxed program invocation.
///
/// Every invocation returns exactly one of these; timeout, exception and
/// no-output are values the caller reduces to a failed example, never
/// conditions that escape as errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The program ran to completion and set the designated output binding.
    Success(serde_json::Value),
    /// Execution exceeded the wall-clock limit and was forcibly terminated.
    Timeout { limit: Duration },
    /// The program raised; type name and message captured verbatim.
    Exception { kind: String, message: String },
    /// The program ran to completion without setting the output binding.
    NoOutput,
}

impl ExecutionOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The produced value, if the run succeeded.
    #[must_use]
    pub fn value(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success(_) => f.write_str("success"),
            Self::Timeout { limit } => write!(f, "timeout after {limit:?}"),
            Self::Exception { kind, message } => write!(f, "exception {kind}: {message}"),
            Self::NoOutput => f.write_str("no output produced"),
        }
    }
}
