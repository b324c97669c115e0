//! Sandboxed program execution.
//!
//! Untrusted synthesized programs never run in the verifier's process or
//! namespace. The [`ProgramExecutor`] trait is the narrow capability handed
//! to the pipeline: program text plus explicit bindings in, a typed
//! [`ExecutionOutcome`] out, with the wall-clock timeout enforced by a hard
//! process-group kill rather than cooperative checks — untrusted code cannot
//! be trusted to yield.

mod driver;
pub mod process;
mod subprocess;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use gridsmith_types::ExecutionOutcome;

pub use subprocess::{SubprocessExecutor, single_binding};

/// Initial variable bindings seeded into the execution namespace. The
/// program observes exactly these names and nothing of the caller's state.
pub type Bindings = serde_json::Map<String, serde_json::Value>;

/// One sandboxed invocation.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// Untrusted source text, entry invocation already appended.
    pub program_source: String,
    pub bindings: Bindings,
    /// Namespace name the result is read back from.
    pub output_binding: String,
    /// Wall-clock limit; expiry forcibly terminates the run.
    pub timeout: Duration,
}

pub type ExecutionFut<'a> = Pin<Box<dyn Future<Output = ExecutionOutcome> + Send + 'a>>;

/// Capability-scoped sandboxed execution.
///
/// Implementations must return an outcome for every invocation: timeout,
/// exception and no-output are values, never panics or errors, so the caller
/// can always reduce a failed run to a failed example.
pub trait ProgramExecutor: Send + Sync {
    fn execute(&self, request: ExecutionRequest) -> ExecutionFut<'_>;
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("no interpreter found on PATH (tried: {candidates})")]
    InterpreterNotFound { candidates: String },
}
