//! Process-isolated executor implementation.

use std::path::PathBuf;
use std::time::Duration;

use gridsmith_types::ExecutionOutcome;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::driver::{classify_output, compose_driver};
use crate::process::{ChildGuard, set_new_session};
use crate::{Bindings, ExecutionRequest, ExecutorError, ProgramExecutor};

/// Cap on captured stdout/stderr per run; untrusted programs can print
/// arbitrarily much.
const MAX_CAPTURE_BYTES: usize = 1024 * 1024;

const DEFAULT_INTERPRETERS: [&str; 2] = ["python3", "python"];

/// Runs each program in its own interpreter process, in its own session,
/// with a hard wall-clock kill.
///
/// Every invocation gets a fresh process: nothing is reused across runs, so
/// a hung or leaking program cannot accumulate state or resources.
#[derive(Debug, Clone)]
pub struct SubprocessExecutor {
    interpreter: PathBuf,
}

impl SubprocessExecutor {
    #[must_use]
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    /// Use the configured interpreter, or probe PATH for a default one.
    pub fn detect(configured: Option<&str>) -> Result<Self, ExecutorError> {
        if let Some(binary) = configured {
            return Ok(Self::new(binary));
        }
        for candidate in DEFAULT_INTERPRETERS {
            if let Ok(path) = which::which(candidate) {
                tracing::debug!(interpreter = %path.display(), "detected interpreter");
                return Ok(Self::new(path));
            }
        }
        Err(ExecutorError::InterpreterNotFound {
            candidates: DEFAULT_INTERPRETERS.join(", "),
        })
    }

    #[must_use]
    pub fn interpreter(&self) -> &std::path::Path {
        &self.interpreter
    }

    async fn run(&self, request: ExecutionRequest) -> ExecutionOutcome {
        let driver = compose_driver(
            &request.program_source,
            &request.bindings,
            &request.output_binding,
        );

        let mut command = Command::new(&self.interpreter);
        command
            .arg("-")
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());
        set_new_session(&mut command);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ExecutionOutcome::Exception {
                    kind: "SpawnFailure".to_string(),
                    message: format!("{}: {e}", self.interpreter.display()),
                };
            }
        };
        let mut guard = ChildGuard::new(child);

        // The interpreter reads the whole script from stdin before executing,
        // so writing first cannot deadlock against unread output.
        if let Some(mut stdin) = guard.child_mut().stdin.take() {
            if let Err(e) = stdin.write_all(driver.as_bytes()).await {
                tracing::debug!("failed to write driver to interpreter stdin: {e}");
            }
            drop(stdin);
        }

        let Some(stdout) = guard.child_mut().stdout.take() else {
            return ExecutionOutcome::Exception {
                kind: "SpawnFailure".to_string(),
                message: "failed to capture stdout".to_string(),
            };
        };
        let Some(stderr) = guard.child_mut().stderr.take() else {
            return ExecutionOutcome::Exception {
                kind: "SpawnFailure".to_string(),
                message: "failed to capture stderr".to_string(),
            };
        };
        let stdout_task = tokio::spawn(read_capped(stdout));
        let stderr_task = tokio::spawn(read_capped(stderr));

        let status = match tokio::time::timeout(request.timeout, guard.child_mut().wait()).await {
            Ok(Ok(status)) => {
                guard.disarm();
                status
            }
            Ok(Err(e)) => {
                // Guard drop kills the group.
                return ExecutionOutcome::Exception {
                    kind: "WaitFailure".to_string(),
                    message: e.to_string(),
                };
            }
            Err(_elapsed) => {
                tracing::debug!(timeout = ?request.timeout, "program exceeded limit, killing");
                // Kill the whole session, then reap the readers; the pipes
                // close once the group is gone.
                drop(guard);
                let _ = stdout_task.await;
                let _ = stderr_task.await;
                return ExecutionOutcome::Timeout {
                    limit: request.timeout,
                };
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();
        classify_output(&stdout, &stderr, status.success(), status.code())
    }
}

async fn read_capped<R: tokio::io::AsyncRead + Unpin>(mut reader: R) -> String {
    let mut collected = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                // Keep draining past the cap so the child never blocks on a
                // full pipe; the buffer just stops growing.
                let remaining = MAX_CAPTURE_BYTES.saturating_sub(collected.len());
                collected.extend_from_slice(&chunk[..n.min(remaining)]);
            }
        }
    }
    String::from_utf8_lossy(&collected).into_owned()
}

impl ProgramExecutor for SubprocessExecutor {
    fn execute(&self, request: ExecutionRequest) -> crate::ExecutionFut<'_> {
        Box::pin(self.run(request))
    }
}

/// Convenience: bindings with a single seeded name.
#[must_use]
pub fn single_binding(name: &str, value: serde_json::Value) -> Bindings {
    let mut bindings = Bindings::new();
    bindings.insert(name.to_string(), value);
    bindings
}

#[cfg(test)]
mod tests {
    use super::{SubprocessExecutor, single_binding};
    use crate::{ExecutionRequest, ProgramExecutor};
    use gridsmith_types::ExecutionOutcome;
    use serde_json::json;
    use std::time::{Duration, Instant};

    fn interpreter() -> Option<SubprocessExecutor> {
        // These tests need a real interpreter on PATH; skip quietly when the
        // environment has none.
        SubprocessExecutor::detect(None).ok()
    }

    fn request(source: &str, timeout_secs: u64) -> ExecutionRequest {
        ExecutionRequest {
            program_source: source.to_string(),
            bindings: crate::Bindings::new(),
            output_binding: "output_grid".to_string(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    #[tokio::test]
    async fn completed_program_yields_success() {
        let Some(executor) = interpreter() else { return };
        let outcome = executor
            .execute(request("output_grid = [[1, 2], [3, 4]]\n", 10))
            .await;
        assert_eq!(outcome, ExecutionOutcome::Success(json!([[1, 2], [3, 4]])));
    }

    #[tokio::test]
    async fn bindings_seed_the_namespace() {
        let Some(executor) = interpreter() else { return };
        let outcome = executor
            .execute(ExecutionRequest {
                program_source: "output_grid = input_grid\n".to_string(),
                bindings: single_binding("input_grid", json!([[5]])),
                output_binding: "output_grid".to_string(),
                timeout: Duration::from_secs(10),
            })
            .await;
        assert_eq!(outcome, ExecutionOutcome::Success(json!([[5]])));
    }

    #[tokio::test]
    async fn raising_program_yields_exception_with_error_text() {
        let Some(executor) = interpreter() else { return };
        let outcome = executor
            .execute(request("raise ValueError('bad grid cell')\n", 10))
            .await;
        assert_eq!(
            outcome,
            ExecutionOutcome::Exception {
                kind: "ValueError".to_string(),
                message: "bad grid cell".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn program_without_output_binding_yields_no_output() {
        let Some(executor) = interpreter() else { return };
        let outcome = executor.execute(request("x = 41 + 1\n", 10)).await;
        assert_eq!(outcome, ExecutionOutcome::NoOutput);
    }

    #[tokio::test]
    async fn infinite_loop_is_killed_within_a_bounded_margin() {
        let Some(executor) = interpreter() else { return };
        let limit = Duration::from_secs(1);
        let started = Instant::now();
        let outcome = executor
            .execute(ExecutionRequest {
                program_source: "while True:\n    pass\n".to_string(),
                bindings: crate::Bindings::new(),
                output_binding: "output_grid".to_string(),
                timeout: limit,
            })
            .await;
        let elapsed = started.elapsed();
        assert_eq!(outcome, ExecutionOutcome::Timeout { limit });
        assert!(elapsed < limit * 2, "kill took {elapsed:?}");
    }

    #[tokio::test]
    async fn repeated_runs_do_not_accumulate_state() {
        let Some(executor) = interpreter() else { return };
        // A binding set by one run must be invisible to the next: each run
        // gets a fresh process and a fresh namespace.
        let first = executor
            .execute(request("leak = 'observable'\noutput_grid = [[1]]\n", 10))
            .await;
        assert!(first.is_success());
        let second = executor
            .execute(request("output_grid = [[1]] if 'leak' in dir() else [[0]]\n", 10))
            .await;
        assert_eq!(second, ExecutionOutcome::Success(json!([[0]])));
    }

    #[tokio::test]
    async fn missing_interpreter_is_a_recoverable_exception() {
        let executor = SubprocessExecutor::new("/nonexistent/interpreter-binary");
        let outcome = executor.execute(request("output_grid = [[1]]\n", 5)).await;
        assert!(matches!(
            outcome,
            ExecutionOutcome::Exception { kind, .. } if kind == "SpawnFailure"
        ));
    }
}
