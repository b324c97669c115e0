//! Driver-script composition and the stdout marker protocol.
//!
//! The untrusted source never runs in the verifier's process. It is wrapped
//! in a small interpreter driver that seeds a fresh namespace with exactly
//! the given bindings, executes the source there, and reports back over
//! single-line stdout markers. The driver catches in-program exceptions
//! itself so the error type and message come back verbatim; everything else
//! (hard crash, kill, garbage output) is classified from the exit status.

use gridsmith_types::ExecutionOutcome;

pub(crate) const RESULT_MARKER: &str = "__gridsmith_result__ ";
pub(crate) const ERROR_MARKER: &str = "__gridsmith_error__ ";
pub(crate) const NO_OUTPUT_MARKER: &str = "__gridsmith_no_output__";

/// Compose the driver script for one invocation.
///
/// The program source, bindings, and output-binding name are embedded as
/// JSON string literals (valid interpreter string literals), so no quoting
/// of untrusted text is ever done by hand.
pub(crate) fn compose_driver(
    program_source: &str,
    bindings: &serde_json::Map<String, serde_json::Value>,
    output_binding: &str,
) -> String {
    let bindings_literal = encode_literal(&serde_json::Value::Object(bindings.clone()).to_string());
    let source_literal = encode_literal(program_source);
    let binding_literal = encode_literal(output_binding);

    format!(
        r#"import json as _gs_json
import sys as _gs_sys

_gs_scope = _gs_json.loads({bindings_literal})
_gs_binding = {binding_literal}
try:
    exec(compile(_gs_json.loads({source_literal}), "<synthesized>", "exec"), _gs_scope)
except Exception as _gs_err:
    print("{error_marker}" + _gs_json.dumps({{"kind": type(_gs_err).__name__, "message": str(_gs_err)}}), flush=True)
    _gs_sys.exit(0)
if _gs_binding in _gs_scope:
    try:
        print("{result_marker}" + _gs_json.dumps(_gs_scope[_gs_binding]), flush=True)
    except (TypeError, ValueError) as _gs_err:
        print("{error_marker}" + _gs_json.dumps({{"kind": type(_gs_err).__name__, "message": str(_gs_err)}}), flush=True)
else:
    print("{no_output_marker}", flush=True)
"#,
        error_marker = ERROR_MARKER,
        result_marker = RESULT_MARKER,
        no_output_marker = NO_OUTPUT_MARKER,
    )
}

/// JSON-encode text into a string literal the interpreter parses back with
/// `json.loads`.
fn encode_literal(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

/// Classify a finished run from its captured stdout and exit status.
pub(crate) fn classify_output(
    stdout: &str,
    stderr: &str,
    exit_success: bool,
    exit_code: Option<i32>,
) -> ExecutionOutcome {
    for line in stdout.lines() {
        if let Some(payload) = line.strip_prefix(RESULT_MARKER) {
            return match serde_json::from_str(payload) {
                Ok(value) => ExecutionOutcome::Success(value),
                Err(e) => ExecutionOutcome::Exception {
                    kind: "ResultDecode".to_string(),
                    message: e.to_string(),
                },
            };
        }
        if let Some(payload) = line.strip_prefix(ERROR_MARKER) {
            let (kind, message) = decode_error(payload);
            return ExecutionOutcome::Exception { kind, message };
        }
        if line.trim() == NO_OUTPUT_MARKER {
            return ExecutionOutcome::NoOutput;
        }
    }

    // The driver never emitted a marker: the interpreter died (crash, kill,
    // bad binary) or the program swallowed stdout entirely.
    let code = exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string());
    let detail = stderr_tail(stderr);
    let message = if exit_success {
        format!("interpreter produced no result marker: {detail}")
    } else {
        format!("interpreter exited with code {code}: {detail}")
    };
    ExecutionOutcome::Exception {
        kind: "InterpreterFailure".to_string(),
        message,
    }
}

fn decode_error(payload: &str) -> (String, String) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(payload) else {
        return ("DriverError".to_string(), payload.to_string());
    };
    let kind = value
        .get("kind")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("DriverError")
        .to_string();
    let message = value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_string();
    (kind, message)
}

const STDERR_TAIL_BYTES: usize = 512;

fn stderr_tail(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        return "(no stderr)".to_string();
    }
    let mut start = trimmed.len().saturating_sub(STDERR_TAIL_BYTES);
    while start > 0 && !trimmed.is_char_boundary(start) {
        start += 1;
    }
    trimmed[start..].to_string()
}
