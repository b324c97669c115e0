//! Verification pipeline for synthesized puzzle artifacts.
//!
//! The controller pulls a description from the description store, obtains
//! candidate programs from the black-box synthesis client, runs them through
//! the sandboxed executor, and accepts a program only when its output matches
//! every ground-truth example exactly. Scheduling is single-threaded and
//! sequential: one task end-to-end before the next, no shared mutable state
//! across tasks beyond the persisted processed-id set.

mod batch;
mod controller;
pub mod prompt;
mod quality;
mod sampler;
mod store;

pub use batch::BatchRunner;
pub use controller::{
    PipelineSettings, PipelineState, TaskError, VerificationPipeline, VerificationReport,
};
pub use quality::{DirectoryAssessment, assess_directory};
pub use sampler::sample_grids;
pub use store::{
    DESCRIPTION_SUFFIX, DescriptionStore, ProcessedSet, StoreError, TraceStore, load_ground_truth,
};
