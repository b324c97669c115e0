//! Prompt rendering for the three synthesis call sites.
//!
//! Content quality is out of scope; these are the fixed templates the
//! pipeline hands to the black-box model.

use gridsmith_types::{TaskData, TaskDescription};

/// Prompt asking for an input-generator program.
#[must_use]
pub fn input_program_prompt(description: &TaskDescription) -> String {
    format!(
        "You are writing a puzzle input generator.\n\n\
         Puzzle description:\n{}\n\
         Write a Python function `generate_puzzle_input(seed)` that returns one \
         input grid as a list of lists of integers 0-9. The generator must be \
         deterministic for a given seed and produce varied grids across seeds. \
         Output exactly one fenced code block.",
        description.render()
    )
}

/// Prompt asking for the output-transformation program, given the already
/// synthesized input generator.
#[must_use]
pub fn output_program_prompt(description: &TaskDescription, input_source: &str) -> String {
    format!(
        "You are writing the puzzle transformation.\n\n\
         Puzzle description:\n{}\n\
         The input grids come from this generator:\n```python\n{input_source}\n```\n\n\
         Write a Python function `generate_puzzle_output(input_grid)` that returns \
         the transformed grid as a list of lists of integers 0-9. \
         Output exactly one fenced code block.",
        description.render()
    )
}

/// Prompt asking for a reasoning trace over a task's training examples,
/// returned as a single JSON object with the ten required keys.
#[must_use]
pub fn trace_prompt(task_id: &str, task: &TaskData, model_name: &str) -> String {
    format!(
        "Solve ARC task {task_id}:\n{}\n\n\
         Output ONLY JSON with keys: task_id, trace_source('llm'), \
         intended_model_family('gemini-flash'), execution_model('{model_name}'), \
         observations(list), hypotheses(list, min 2), rejected_hypotheses(list of \
         {{hypothesis, reason}}), selected_rule(str), step_plan(list), \
         confidence(0.7-0.9). No markdown.",
        format_task(task_id, task)
    )
}

/// Render a task's examples into prompt text; test outputs stay hidden.
#[must_use]
pub fn format_task(task_id: &str, task: &TaskData) -> String {
    let mut lines = vec![format!("Task ID: {task_id}"), "\nTRAINING EXAMPLES:".to_string()];
    for (idx, pair) in task.train.iter().enumerate() {
        lines.push(format!("\nExample {}:", idx + 1));
        lines.push("Input:".to_string());
        lines.push(pair.input.to_string());
        lines.push("Output:".to_string());
        lines.push(pair.output.to_string());
    }
    if !task.test.is_empty() {
        lines.push("\nTEST EXAMPLES (outputs hidden):".to_string());
        for (idx, example) in task.test.iter().enumerate() {
            lines.push(format!("\nTest {}:", idx + 1));
            lines.push("Input:".to_string());
            lines.push(example.input.to_string());
            lines.push("(Output: hidden)".to_string());
        }
    }
    lines.join("\n")
}
