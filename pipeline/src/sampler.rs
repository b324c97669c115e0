//! Deduplicating grid sampling from a generator program.

use std::time::Duration;

use gridsmith_exec::{Bindings, ExecutionRequest, ProgramExecutor};
use gridsmith_types::{GeneratorProgram, Grid, INPUT_BINDING};

/// Invoke `program` with increasing seeds until `target_count` distinct
/// grids are collected or the attempt budget (`2 × target_count`) runs out.
///
/// Execution failures and malformed grids consume an attempt and nothing
/// else; duplicates (full structural comparison against everything already
/// collected) are discarded. Returning fewer than `target_count` grids is a
/// valid outcome, not an error.
pub async fn sample_grids(
    executor: &dyn ProgramExecutor,
    program: &GeneratorProgram,
    target_count: usize,
    starting_seed: u64,
    timeout: Duration,
) -> Vec<Grid> {
    let mut grids: Vec<Grid> = Vec::new();
    let attempt_budget = target_count.saturating_mul(2);

    for attempt in 0..attempt_budget {
        if grids.len() >= target_count {
            break;
        }
        let seed = starting_seed.wrapping_add(attempt as u64);
        let request = ExecutionRequest {
            program_source: program.invoked(seed),
            bindings: Bindings::new(),
            output_binding: INPUT_BINDING.to_string(),
            timeout,
        };
        let outcome = executor.execute(request).await;
        let Some(grid) = Grid::validate_and_convert(outcome.value()) else {
            tracing::debug!(seed, %outcome, "sample attempt produced no usable grid");
            continue;
        };
        if grids.contains(&grid) {
            tracing::debug!(seed, "sample attempt produced a duplicate grid");
            continue;
        }
        grids.push(grid);
    }

    tracing::debug!(
        collected = grids.len(),
        target = target_count,
        "grid sampling finished"
    );
    grids
}
