//! The verification pipeline controller.
//!
//! One task identifier moves through a fixed state machine:
//! `DescriptionLoaded → InputProgramSynthesized → OutputProgramSynthesized →
//! GridsSampled → TestedAgainstGroundTruth → Accepted | Rejected`.
//! Task-level failures (missing description, synthesis contract violations,
//! failed synthesis calls) abort only the task; example-level failures are
//! recorded per example and never abort siblings.

use std::sync::Arc;
use std::time::Duration;

use gridsmith_config::GridsmithConfig;
use gridsmith_exec::{Bindings, ExecutionRequest, ProgramExecutor};
use gridsmith_synthesis::{SynthesisClient, SynthesisError, extract_code_block, extract_json_object};
use gridsmith_types::{
    ExampleOutcome, ExecutionOutcome, GeneratorProgram, Grid, GridPair, GroundTruth,
    INPUT_BINDING, OUTPUT_BINDING, ReasoningTrace, SchemaViolation, SynthesisContractViolation,
    TaskData, TaskDescription, TaskVerdict, TransformProgram, grids_equal,
};

use crate::prompt;
use crate::sampler::sample_grids;
use crate::store::{DescriptionStore, StoreError};

/// States of one verification attempt, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    DescriptionLoaded,
    InputProgramSynthesized,
    OutputProgramSynthesized,
    GridsSampled,
    TestedAgainstGroundTruth,
    Accepted,
    Rejected,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DescriptionLoaded => "description-loaded",
            Self::InputProgramSynthesized => "input-program-synthesized",
            Self::OutputProgramSynthesized => "output-program-synthesized",
            Self::GridsSampled => "grids-sampled",
            Self::TestedAgainstGroundTruth => "tested-against-ground-truth",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Failure of one task's verification attempt. Recorded and skipped at the
/// batch level, never thrown past it.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no ground truth for task {task_id}")]
    MissingGroundTruth { task_id: String },
    #[error("invalid synthesis output: {0}")]
    Contract(#[from] SynthesisContractViolation),
    #[error("synthesis call failed: {0}")]
    Synthesis(#[from] SynthesisError),
    #[error("generated trace violates schema: {0}")]
    Schema(#[from] SchemaViolation),
    #[error("synthesis response contained no JSON object")]
    NoTraceJson,
    #[error("trace JSON is unparseable: {0}")]
    TraceParse(String),
}

/// Knobs for one verification run.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    /// Wall-clock limit per program invocation.
    pub per_example_timeout: Duration,
    /// Distinct grids to sample per task.
    pub sample_target: usize,
    /// First generator seed.
    pub starting_seed: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            per_example_timeout: Duration::from_secs(5),
            sample_target: 5,
            starting_seed: 42,
        }
    }
}

impl PipelineSettings {
    #[must_use]
    pub fn from_config(config: &GridsmithConfig) -> Self {
        Self {
            per_example_timeout: config.executor.timeout(),
            sample_target: config.sampler.target_count,
            starting_seed: config.sampler.starting_seed,
        }
    }
}

/// Everything one verification attempt produced.
#[derive(Debug, Clone)]
pub struct VerificationReport {
    pub verdict: TaskVerdict,
    pub final_state: PipelineState,
    pub input_program: GeneratorProgram,
    pub output_program: TransformProgram,
    /// Sampled input grids paired with the program's own outputs, kept for
    /// manual inspection.
    pub sampled_pairs: Vec<GridPair>,
    pub sampled_grid_count: usize,
}

/// Sequences description loading, program synthesis, grid sampling, and
/// ground-truth testing for one task at a time.
pub struct VerificationPipeline {
    executor: Arc<dyn ProgramExecutor>,
    synthesis: Arc<dyn SynthesisClient>,
    descriptions: DescriptionStore,
    ground_truth: GroundTruth,
    settings: PipelineSettings,
}

impl VerificationPipeline {
    #[must_use]
    pub fn new(
        executor: Arc<dyn ProgramExecutor>,
        synthesis: Arc<dyn SynthesisClient>,
        descriptions: DescriptionStore,
        ground_truth: GroundTruth,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            executor,
            synthesis,
            descriptions,
            ground_truth,
            settings,
        }
    }

    #[must_use]
    pub fn ground_truth(&self) -> &GroundTruth {
        &self.ground_truth
    }

    /// Run the full verification state machine for one task.
    pub async fn verify_task(&self, task_id: &str) -> Result<VerificationReport, TaskError> {
        let task = self
            .ground_truth
            .get(task_id)
            .ok_or_else(|| TaskError::MissingGroundTruth {
                task_id: task_id.to_string(),
            })?;

        let description = self.descriptions.load(task_id)?;
        let mut state = PipelineState::DescriptionLoaded;
        tracing::info!(task_id, %state, "pipeline transition");

        let input_program = self.synthesize_input(&description).await?;
        advance(&mut state, PipelineState::InputProgramSynthesized, task_id);

        let output_program = self.synthesize_output(&description, &input_program).await?;
        advance(&mut state, PipelineState::OutputProgramSynthesized, task_id);

        let grids = sample_grids(
            self.executor.as_ref(),
            &input_program,
            self.settings.sample_target,
            self.settings.starting_seed,
            self.settings.per_example_timeout,
        )
        .await;
        advance(&mut state, PipelineState::GridsSampled, task_id);

        let sampled_pairs = self.transform_sampled(&output_program, &grids).await;

        let examples = self.test_against_ground_truth(task_id, &output_program, task).await;
        advance(&mut state, PipelineState::TestedAgainstGroundTruth, task_id);

        let success_count = examples.iter().filter(|e| e.is_match()).count();
        let total = examples.len();
        let accepted = examples.iter().all(ExampleOutcome::is_match);
        advance(
            &mut state,
            if accepted {
                PipelineState::Accepted
            } else {
                PipelineState::Rejected
            },
            task_id,
        );
        tracing::info!(task_id, accepted, success_count, total, "verification finished");

        Ok(VerificationReport {
            verdict: TaskVerdict {
                task_id: task_id.to_string(),
                accepted,
                success_count,
                total,
                examples,
                error: None,
            },
            final_state: state,
            input_program,
            output_program,
            sampled_pairs,
            sampled_grid_count: grids.len(),
        })
    }

    /// Generate, validate, and return a reasoning trace for a task.
    ///
    /// The model's echo of the task id is not trusted; ours is authoritative.
    pub async fn generate_trace(
        &self,
        task_id: &str,
        model_name: &str,
    ) -> Result<ReasoningTrace, TaskError> {
        let task = self
            .ground_truth
            .get(task_id)
            .ok_or_else(|| TaskError::MissingGroundTruth {
                task_id: task_id.to_string(),
            })?;

        let rendered = prompt::trace_prompt(task_id, task, model_name);
        let text = self.synthesis.synthesize(&rendered).await?;
        let json_text = extract_json_object(&text).ok_or(TaskError::NoTraceJson)?;
        let mut value: serde_json::Value =
            serde_json::from_str(json_text).map_err(|e| TaskError::TraceParse(e.to_string()))?;

        gridsmith_types::validate_trace(&value)?;
        value["task_id"] = serde_json::Value::String(task_id.to_string());
        Ok(ReasoningTrace::from_value(&value)?)
    }

    async fn synthesize_input(
        &self,
        description: &TaskDescription,
    ) -> Result<GeneratorProgram, TaskError> {
        let rendered = prompt::input_program_prompt(description);
        let text = self.synthesis.synthesize(&rendered).await?;
        let code = extract_code_block(&text);
        Ok(GeneratorProgram::parse(code)?)
    }

    async fn synthesize_output(
        &self,
        description: &TaskDescription,
        input_program: &GeneratorProgram,
    ) -> Result<TransformProgram, TaskError> {
        let rendered = prompt::output_program_prompt(description, input_program.source());
        let text = self.synthesis.synthesize(&rendered).await?;
        let code = extract_code_block(&text);
        Ok(TransformProgram::parse(code)?)
    }

    /// Test the transform against every ground-truth training example.
    /// Failures reduce to per-example outcomes; siblings always run.
    async fn test_against_ground_truth(
        &self,
        task_id: &str,
        program: &TransformProgram,
        task: &TaskData,
    ) -> Vec<ExampleOutcome> {
        let mut outcomes = Vec::with_capacity(task.train.len());
        for (idx, pair) in task.train.iter().enumerate() {
            let outcome = self.run_transform(program, &pair.input).await;
            let example = match outcome {
                ExecutionOutcome::Success(raw) => {
                    // A malformed grid is a missing prediction, which the
                    // oracle never matches.
                    let predicted = Grid::validate_and_convert(Some(&raw));
                    if grids_equal(predicted.as_ref(), Some(&pair.output)) {
                        ExampleOutcome::Match
                    } else {
                        ExampleOutcome::Mismatch
                    }
                }
                ExecutionOutcome::Timeout { .. } => ExampleOutcome::Timeout,
                ExecutionOutcome::Exception { kind, message } => {
                    ExampleOutcome::Exception { kind, message }
                }
                ExecutionOutcome::NoOutput => ExampleOutcome::NoOutput,
            };
            tracing::debug!(task_id, example = idx + 1, outcome = ?example, "example tested");
            outcomes.push(example);
        }
        outcomes
    }

    /// Run the transform over the sampled inputs, keeping the pairs whose
    /// outputs validated.
    async fn transform_sampled(
        &self,
        program: &TransformProgram,
        grids: &[Grid],
    ) -> Vec<GridPair> {
        let mut pairs = Vec::new();
        for grid in grids {
            let outcome = self.run_transform(program, grid).await;
            if let Some(output) = Grid::validate_and_convert(outcome.value()) {
                pairs.push(GridPair {
                    input: grid.clone(),
                    output,
                });
            }
        }
        pairs
    }

    async fn run_transform(&self, program: &TransformProgram, input: &Grid) -> ExecutionOutcome {
        let mut bindings = Bindings::new();
        bindings.insert(INPUT_BINDING.to_string(), input.to_value());
        let request = ExecutionRequest {
            program_source: program.invoked(),
            bindings,
            output_binding: OUTPUT_BINDING.to_string(),
            timeout: self.settings.per_example_timeout,
        };
        self.executor.execute(request).await
    }
}

fn advance(state: &mut PipelineState, next: PipelineState, task_id: &str) {
    *state = next;
    tracing::info!(task_id, state = %next, "pipeline transition");
}
