//! Sequential batch verification with resumability.

use std::path::Path;

use gridsmith_config::PathSettings;
use gridsmith_types::{BatchReport, TaskVerdict};

use crate::controller::{VerificationPipeline, VerificationReport};
use crate::store::{ProcessedSet, StoreError};

/// Drives [`VerificationPipeline`] over a list of task ids, one task
/// end-to-end before the next.
///
/// Single-task failures are recorded in the report and never abort the
/// batch; the batch always completes and emits its report. The processed-id
/// set is consulted before starting work and appended after each task, so an
/// interrupted batch resumes where it stopped.
pub struct BatchRunner {
    pipeline: VerificationPipeline,
    paths: PathSettings,
}

impl BatchRunner {
    #[must_use]
    pub fn new(pipeline: VerificationPipeline, paths: PathSettings) -> Self {
        Self { pipeline, paths }
    }

    pub async fn run(&self, task_ids: &[String]) -> Result<BatchReport, StoreError> {
        let mut processed = ProcessedSet::load(&self.paths.processed)?;
        let mut verdicts: Vec<TaskVerdict> = Vec::new();

        for task_id in task_ids {
            if processed.contains(task_id) {
                tracing::info!(task_id, "already processed, skipping");
                continue;
            }
            match self.pipeline.verify_task(task_id).await {
                Ok(report) => {
                    if let Err(e) = self.persist_artifacts(&report) {
                        tracing::warn!(task_id, "failed to persist artifacts: {e}");
                    }
                    verdicts.push(report.verdict);
                }
                Err(e) => {
                    tracing::warn!(task_id, "task failed before testing: {e}");
                    verdicts.push(TaskVerdict::failed(task_id, e.to_string()));
                }
            }
            processed.mark(task_id)?;
        }

        let passed = verdicts.iter().filter(|v| v.accepted).count();
        let report = BatchReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            total_tasks: verdicts.len(),
            passed,
            verdicts,
        };
        write_json(&self.paths.report, &report)?;
        tracing::info!(
            total = report.total_tasks,
            passed,
            report = %self.paths.report.display(),
            "batch finished"
        );
        Ok(report)
    }

    /// Persist the accepted program source and the sampled pairs for manual
    /// inspection. Rejected programs are discarded.
    fn persist_artifacts(&self, report: &VerificationReport) -> Result<(), StoreError> {
        let task_id = &report.verdict.task_id;
        if report.verdict.accepted {
            let combined = format!(
                "{}\n\n{}",
                report.input_program.source(),
                report.output_program.source()
            );
            let path = self.paths.programs_dir.join(format!("{task_id}.py"));
            write_text(&path, &combined)?;
            tracing::debug!(task_id, path = %path.display(), "persisted accepted program");
        }
        if !report.sampled_pairs.is_empty() {
            let path = self.paths.grids_dir.join(format!("{task_id}_pairs.json"));
            write_json(&path, &report.sampled_pairs)?;
        }
        Ok(())
    }
}

fn write_text(path: &Path, content: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, content).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| StoreError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    write_text(path, &text)
}
