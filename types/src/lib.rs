//! Core domain types for Gridsmith.
//!
//! This crate contains pure domain types with no IO, no async, and minimal
//! dependencies. Everything here can be used from any layer of the pipeline.

mod description;
mod execution;
mod grid;
mod program;
mod task;
mod trace;

pub use description::{DescriptionError, TaskDescription};
pub use execution::ExecutionOutcome;
pub use grid::{Grid, GridError, PALETTE_MAX, grids_equal};
pub use program::{
    GeneratorProgram, INPUT_BINDING, OUTPUT_BINDING, SynthesisContractViolation, TransformProgram,
};
pub use task::{BatchReport, ExampleOutcome, GridPair, GroundTruth, TaskData, TaskVerdict, TestInput};
pub use trace::{
    CONFIDENCE_MAX, CONFIDENCE_MIN, REQUIRED_TRACE_KEYS, ReasoningTrace, RejectedHypothesis,
    SchemaViolation, TRACE_SOURCE_SENTINEL, validate_trace,
};
