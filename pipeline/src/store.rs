//! Filesystem collaborators: descriptions, traces, ground truth, and the
//! processed-id set.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use gridsmith_types::{DescriptionError, GroundTruth, ReasoningTrace, SchemaViolation, TaskDescription};

pub const DESCRIPTION_SUFFIX: &str = ".desc.md";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no record for task {task_id} at {path}")]
    NotFound { task_id: String, path: PathBuf },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed record at {path}: {message}")]
    Malformed { path: PathBuf, message: String },
    #[error("trace at {path} violates schema: {source}")]
    Schema {
        path: PathBuf,
        source: SchemaViolation,
    },
    #[error("description at {path} is malformed: {source}")]
    Description {
        path: PathBuf,
        source: DescriptionError,
    },
}

fn read_text(path: &Path) -> Result<String, StoreError> {
    std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
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

fn list_stems(dir: &Path, suffix: &str) -> Result<Vec<String>, StoreError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).map_err(|source| StoreError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut ids = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(stem) = name.strip_suffix(suffix) {
            ids.push(stem.to_string());
        }
    }
    ids.sort_unstable();
    Ok(ids)
}

/// One five-section text record per task identifier.
#[derive(Debug, Clone)]
pub struct DescriptionStore {
    dir: PathBuf,
}

impl DescriptionStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn path_for(&self, task_id: &str) -> PathBuf {
        self.dir.join(format!("{task_id}{DESCRIPTION_SUFFIX}"))
    }

    pub fn load(&self, task_id: &str) -> Result<TaskDescription, StoreError> {
        let path = self.path_for(task_id);
        if !path.exists() {
            return Err(StoreError::NotFound {
                task_id: task_id.to_string(),
                path,
            });
        }
        let text = read_text(&path)?;
        TaskDescription::parse(&text).map_err(|source| StoreError::Description { path, source })
    }

    pub fn save(&self, task_id: &str, description: &TaskDescription) -> Result<PathBuf, StoreError> {
        let path = self.path_for(task_id);
        write_text(&path, &description.render())?;
        Ok(path)
    }

    pub fn list_ids(&self) -> Result<Vec<String>, StoreError> {
        list_stems(&self.dir, DESCRIPTION_SUFFIX)
    }
}

/// One validated trace JSON file per task identifier.
#[derive(Debug, Clone)]
pub struct TraceStore {
    dir: PathBuf,
}

impl TraceStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn path_for(&self, task_id: &str) -> PathBuf {
        self.dir.join(format!("{task_id}.json"))
    }

    /// Load and re-validate; a persisted trace that no longer passes the
    /// schema is surfaced, never silently coerced.
    pub fn load(&self, task_id: &str) -> Result<ReasoningTrace, StoreError> {
        let path = self.path_for(task_id);
        if !path.exists() {
            return Err(StoreError::NotFound {
                task_id: task_id.to_string(),
                path,
            });
        }
        let text = read_text(&path)?;
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| StoreError::Malformed {
                path: path.clone(),
                message: e.to_string(),
            })?;
        ReasoningTrace::from_value(&value).map_err(|source| StoreError::Schema { path, source })
    }

    pub fn save(&self, trace: &ReasoningTrace) -> Result<PathBuf, StoreError> {
        let path = self.path_for(&trace.task_id);
        let text = serde_json::to_string_pretty(trace).map_err(|e| StoreError::Malformed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        write_text(&path, &text)?;
        Ok(path)
    }

    pub fn list_ids(&self) -> Result<Vec<String>, StoreError> {
        list_stems(&self.dir, ".json")
    }
}

/// Load the read-only ground-truth mapping. A missing file is a fatal
/// configuration error, unlike every per-task condition.
pub fn load_ground_truth(path: &Path) -> Result<GroundTruth, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound {
            task_id: "<ground truth>".to_string(),
            path: path.to_path_buf(),
        });
    }
    let text = read_text(path)?;
    serde_json::from_str(&text).map_err(|e| StoreError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Persisted set of already-processed task ids, for resumability.
///
/// Plain newline-delimited ids; corruption degrades to re-processing, never
/// to wrong verdicts.
#[derive(Debug)]
pub struct ProcessedSet {
    path: PathBuf,
    ids: HashSet<String>,
}

impl ProcessedSet {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let ids = if path.exists() {
            read_text(&path)?
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ToString::to_string)
                .collect()
        } else {
            HashSet::new()
        };
        Ok(Self { path, ids })
    }

    #[must_use]
    pub fn contains(&self, task_id: &str) -> bool {
        self.ids.contains(task_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Record a processed id, appending to the backing file.
    pub fn mark(&mut self, task_id: &str) -> Result<(), StoreError> {
        if !self.ids.insert(task_id.to_string()) {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;
        writeln!(file, "{task_id}").map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{DescriptionStore, ProcessedSet, StoreError, TraceStore, load_ground_truth};
    use gridsmith_types::{ReasoningTrace, TaskDescription};
    use serde_json::json;

    fn description() -> TaskDescription {
        TaskDescription {
            rules_summary: "tile the input".to_string(),
            input_generation: "small random grids".to_string(),
            solution_steps: "1. tile".to_string(),
            key_insight: "scaling by itself".to_string(),
            puzzle_concepts: "- tiling".to_string(),
        }
    }

    fn trace() -> ReasoningTrace {
        ReasoningTrace::from_value(&json!({
            "task_id": "t1",
            "trace_source": "llm",
            "intended_model_family": "gemini-flash",
            "execution_model": "gemini-3-flash-preview",
            "observations": ["obs"],
            "hypotheses": ["a", "b"],
            "rejected_hypotheses": [],
            "selected_rule": "rule",
            "step_plan": ["step"],
            "confidence": 0.8
        }))
        .unwrap()
    }

    #[test]
    fn description_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DescriptionStore::new(dir.path());
        store.save("007bbfb7", &description()).unwrap();
        let loaded = store.load("007bbfb7").unwrap();
        assert_eq!(loaded, description());
        assert_eq!(store.list_ids().unwrap(), vec!["007bbfb7"]);
    }

    #[test]
    fn missing_description_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = DescriptionStore::new(dir.path());
        assert!(matches!(
            store.load("absent"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn trace_store_revalidates_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TraceStore::new(dir.path());
        let path = store.save(&trace()).unwrap();

        // Corrupt the persisted confidence out of range.
        let mut raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        raw["confidence"] = json!(0.95);
        std::fs::write(&path, serde_json::to_string(&raw).unwrap()).unwrap();

        assert!(matches!(store.load("t1"), Err(StoreError::Schema { .. })));
    }

    #[test]
    fn ground_truth_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_ground_truth(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn ground_truth_parses_task_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("truth.json");
        std::fs::write(
            &path,
            json!({
                "t1": {"train": [{"input": [[1]], "output": [[1, 1]]}], "test": []}
            })
            .to_string(),
        )
        .unwrap();
        let truth = load_ground_truth(&path).unwrap();
        assert_eq!(truth["t1"].train.len(), 1);
    }

    #[test]
    fn processed_set_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed.txt");

        let mut set = ProcessedSet::load(&path).unwrap();
        assert!(set.is_empty());
        set.mark("t1").unwrap();
        set.mark("t2").unwrap();
        set.mark("t1").unwrap(); // idempotent

        let reloaded = ProcessedSet::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("t1"));
        assert!(!reloaded.contains("t3"));
    }
}
