//! End-to-end controller scenarios against stub executor and synthesis
//! implementations.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use gridsmith_config::PathSettings;
use gridsmith_exec::{ExecutionFut, ExecutionRequest, ProgramExecutor};
use gridsmith_pipeline::{
    BatchRunner, DescriptionStore, PipelineSettings, PipelineState, TaskError,
    VerificationPipeline,
};
use gridsmith_synthesis::{SynthesisClient, SynthesisFut};
use gridsmith_types::{
    ExampleOutcome, ExecutionOutcome, Grid, GridPair, GroundTruth, TaskData, TaskDescription,
};
use serde_json::json;

type ExecutorFn = dyn Fn(&ExecutionRequest) -> ExecutionOutcome + Send + Sync;

struct StubExecutor {
    behavior: Box<ExecutorFn>,
}

impl StubExecutor {
    fn new(behavior: impl Fn(&ExecutionRequest) -> ExecutionOutcome + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            behavior: Box::new(behavior),
        })
    }
}

impl ProgramExecutor for StubExecutor {
    fn execute(&self, request: ExecutionRequest) -> ExecutionFut<'_> {
        let outcome = (self.behavior)(&request);
        Box::pin(std::future::ready(outcome))
    }
}

type SynthesisFn = dyn Fn(&str) -> String + Send + Sync;

struct StubSynthesis {
    respond: Box<SynthesisFn>,
}

impl StubSynthesis {
    fn new(respond: impl Fn(&str) -> String + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
        })
    }
}

impl SynthesisClient for StubSynthesis {
    fn synthesize<'a>(&'a self, prompt: &'a str) -> SynthesisFut<'a> {
        let text = (self.respond)(prompt);
        Box::pin(std::future::ready(Ok(text)))
    }
}

const INPUT_PROGRAM: &str = "```python\ndef generate_puzzle_input(seed):\n    return [[seed % 10]]\n```";
const OUTPUT_PROGRAM: &str = "```python\ndef generate_puzzle_output(input_grid):\n    return [row + row for row in input_grid]\n```";

/// Answers synthesis prompts with well-formed programs.
fn program_synthesis() -> Arc<StubSynthesis> {
    StubSynthesis::new(|prompt| {
        if prompt.contains("input generator") {
            INPUT_PROGRAM.to_string()
        } else {
            OUTPUT_PROGRAM.to_string()
        }
    })
}

fn grid(rows: Vec<Vec<u8>>) -> Grid {
    Grid::from_rows(rows).unwrap()
}

fn description() -> TaskDescription {
    TaskDescription {
        rules_summary: "duplicate each row horizontally".to_string(),
        input_generation: "single-cell grids".to_string(),
        solution_steps: "1. duplicate each row".to_string(),
        key_insight: "output width is twice the input width".to_string(),
        puzzle_concepts: "- scaling".to_string(),
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    descriptions: DescriptionStore,
    paths: PathSettings,
}

fn fixture(task_ids: &[&str]) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let descriptions = DescriptionStore::new(dir.path().join("descriptions"));
    for task_id in task_ids {
        descriptions.save(task_id, &description()).unwrap();
    }
    let paths = PathSettings {
        descriptions_dir: dir.path().join("descriptions"),
        traces_dir: dir.path().join("traces"),
        programs_dir: dir.path().join("programs"),
        grids_dir: dir.path().join("grids"),
        ground_truth: dir.path().join("truth.json"),
        report: dir.path().join("report.json"),
        processed: dir.path().join("processed.txt"),
    };
    Fixture {
        _dir: dir,
        descriptions,
        paths,
    }
}

fn settings() -> PipelineSettings {
    PipelineSettings {
        per_example_timeout: Duration::from_secs(1),
        sample_target: 2,
        starting_seed: 0,
    }
}

/// Stub interpreter: generator invocations return the seeded single-cell
/// grid; transform invocations duplicate each row, except where `wrong`
/// says to misbehave on a given input.
fn duplicating_executor(
    wrong: impl Fn(&serde_json::Value) -> Option<ExecutionOutcome> + Send + Sync + 'static,
) -> Arc<StubExecutor> {
    StubExecutor::new(move |request| {
        if request.output_binding == "input_grid" {
            return ExecutionOutcome::Success(json!([[1]]));
        }
        let input = request.bindings.get("input_grid").cloned().unwrap_or(json!(null));
        if let Some(outcome) = wrong(&input) {
            return outcome;
        }
        let rows = input.as_array().cloned().unwrap_or_default();
        let doubled: Vec<serde_json::Value> = rows
            .iter()
            .map(|row| {
                let cells = row.as_array().cloned().unwrap_or_default();
                let mut doubled_row = cells.clone();
                doubled_row.extend(cells);
                json!(doubled_row)
            })
            .collect();
        ExecutionOutcome::Success(json!(doubled))
    })
}

#[tokio::test]
async fn t1_one_mismatched_example_rejects_the_whole_program() {
    let fx = fixture(&["T1"]);
    let mut truth: GroundTruth = BTreeMap::new();
    truth.insert(
        "T1".to_string(),
        TaskData {
            train: vec![
                GridPair {
                    input: grid(vec![vec![1]]),
                    output: grid(vec![vec![1, 1]]),
                },
                GridPair {
                    input: grid(vec![vec![2]]),
                    output: grid(vec![vec![2, 2]]),
                },
            ],
            test: vec![],
        },
    );

    // Correct on example 1, wrong-shaped grid on example 2.
    let executor = duplicating_executor(|input| {
        (*input == json!([[2]])).then(|| ExecutionOutcome::Success(json!([[2]])))
    });
    let pipeline = VerificationPipeline::new(
        executor,
        program_synthesis(),
        fx.descriptions.clone(),
        truth,
        settings(),
    );

    let report = pipeline.verify_task("T1").await.unwrap();
    assert!(!report.verdict.accepted);
    assert_eq!(report.final_state, PipelineState::Rejected);
    assert_eq!(report.verdict.success_count, 1);
    assert_eq!(report.verdict.total, 2);
    assert_eq!(
        report.verdict.examples,
        vec![ExampleOutcome::Match, ExampleOutcome::Mismatch]
    );
}

#[tokio::test]
async fn t2_exact_match_on_every_example_accepts() {
    let fx = fixture(&["T2"]);
    let mut truth: GroundTruth = BTreeMap::new();
    truth.insert(
        "T2".to_string(),
        TaskData {
            train: vec![GridPair {
                input: grid(vec![vec![3]]),
                output: grid(vec![vec![3, 3]]),
            }],
            test: vec![],
        },
    );

    let executor = duplicating_executor(|_| None);
    let pipeline = VerificationPipeline::new(
        executor,
        program_synthesis(),
        fx.descriptions.clone(),
        truth,
        settings(),
    );

    let report = pipeline.verify_task("T2").await.unwrap();
    assert!(report.verdict.accepted);
    assert_eq!(report.final_state, PipelineState::Accepted);
    assert_eq!(report.verdict.success_count, 1);
    assert_eq!(report.verdict.total, 1);
    // The sampled pairs carry the program's own outputs for inspection.
    assert!(!report.sampled_pairs.is_empty());
}

#[tokio::test]
async fn execution_failures_reduce_to_example_outcomes_without_aborting_siblings() {
    let fx = fixture(&["T3"]);
    let mut truth: GroundTruth = BTreeMap::new();
    truth.insert(
        "T3".to_string(),
        TaskData {
            train: vec![
                GridPair {
                    input: grid(vec![vec![4]]),
                    output: grid(vec![vec![4, 4]]),
                },
                GridPair {
                    input: grid(vec![vec![5]]),
                    output: grid(vec![vec![5, 5]]),
                },
                GridPair {
                    input: grid(vec![vec![6]]),
                    output: grid(vec![vec![6, 6]]),
                },
            ],
            test: vec![],
        },
    );

    let executor = duplicating_executor(|input| {
        if *input == json!([[4]]) {
            Some(ExecutionOutcome::Timeout {
                limit: Duration::from_secs(1),
            })
        } else if *input == json!([[5]]) {
            Some(ExecutionOutcome::Exception {
                kind: "IndexError".to_string(),
                message: "row 3 out of range".to_string(),
            })
        } else {
            None
        }
    });
    let pipeline = VerificationPipeline::new(
        executor,
        program_synthesis(),
        fx.descriptions.clone(),
        truth,
        settings(),
    );

    let report = pipeline.verify_task("T3").await.unwrap();
    assert!(!report.verdict.accepted);
    // Every sibling example still ran and is diagnosed individually.
    assert_eq!(
        report.verdict.examples,
        vec![
            ExampleOutcome::Timeout,
            ExampleOutcome::Exception {
                kind: "IndexError".to_string(),
                message: "row 3 out of range".to_string(),
            },
            ExampleOutcome::Match,
        ]
    );
}

#[tokio::test]
async fn missing_entry_declaration_is_an_invalid_synthesis_hard_stop() {
    let fx = fixture(&["T4"]);
    let mut truth: GroundTruth = BTreeMap::new();
    truth.insert(
        "T4".to_string(),
        TaskData {
            train: vec![],
            test: vec![],
        },
    );

    let synthesis = StubSynthesis::new(|_| "```python\nprint('no entry point')\n```".to_string());
    let executor = duplicating_executor(|_| None);
    let pipeline = VerificationPipeline::new(
        executor,
        synthesis,
        fx.descriptions.clone(),
        truth,
        settings(),
    );

    let err = pipeline.verify_task("T4").await.unwrap_err();
    assert!(matches!(err, TaskError::Contract(_)));
}

#[tokio::test]
async fn batch_records_failures_resumes_and_always_emits_a_report() {
    let fx = fixture(&["good", "bad"]);
    let mut truth: GroundTruth = BTreeMap::new();
    truth.insert(
        "good".to_string(),
        TaskData {
            train: vec![GridPair {
                input: grid(vec![vec![7]]),
                output: grid(vec![vec![7, 7]]),
            }],
            test: vec![],
        },
    );
    truth.insert(
        "bad".to_string(),
        TaskData {
            train: vec![],
            test: vec![],
        },
    );

    // Make the "bad" task's description poison its synthesized program.
    let mut poisoned = description();
    poisoned.rules_summary = "POISON".to_string();
    fx.descriptions.save("bad", &poisoned).unwrap();

    let synthesis = StubSynthesis::new(|prompt| {
        if prompt.contains("POISON") {
            "no code at all".to_string()
        } else if prompt.contains("input generator") {
            INPUT_PROGRAM.to_string()
        } else {
            OUTPUT_PROGRAM.to_string()
        }
    });
    let executor = duplicating_executor(|_| None);
    let pipeline = VerificationPipeline::new(
        executor,
        synthesis,
        fx.descriptions.clone(),
        truth,
        settings(),
    );
    let runner = BatchRunner::new(pipeline, fx.paths.clone());

    let ids = vec!["bad".to_string(), "good".to_string()];
    let report = runner.run(&ids).await.unwrap();

    assert_eq!(report.total_tasks, 2);
    assert_eq!(report.passed, 1);
    let bad = report.verdicts.iter().find(|v| v.task_id == "bad").unwrap();
    assert!(!bad.accepted);
    assert!(bad.error.as_deref().unwrap().contains("invalid synthesis output"));
    let good = report.verdicts.iter().find(|v| v.task_id == "good").unwrap();
    assert!(good.accepted);

    // Artifacts: accepted program persisted, report written.
    assert!(fx.paths.programs_dir.join("good.py").exists());
    assert!(!fx.paths.programs_dir.join("bad.py").exists());
    assert!(fx.paths.report.exists());

    // Resumability: a second run finds both ids processed and does nothing.
    let rerun = runner.run(&ids).await.unwrap();
    assert_eq!(rerun.total_tasks, 0);
}
