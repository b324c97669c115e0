//! Configuration loading, parsing, and persistence for Gridsmith.
//!
//! Configuration is an explicit object with lifecycle scoped to one pipeline
//! run: it is loaded once at startup and passed into the components that need
//! it. There is no global, module-level API state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Settings for the external generative synthesis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    /// Model identifier sent to the synthesis endpoint.
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Endpoint base URL override; the client default is used when absent.
    pub base_url: Option<String>,
    /// Minimum pause between consecutive synthesis calls, in seconds.
    pub min_call_interval_secs: u64,
    /// Whole-request timeout, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            model: "gemini-3-flash-preview".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: None,
            min_call_interval_secs: 10,
            request_timeout_secs: 120,
        }
    }
}

/// Settings for sandboxed program execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Interpreter binary; probed on PATH when not set.
    pub interpreter: Option<String>,
    /// Per-invocation wall-clock timeout, in seconds.
    pub timeout_secs: u64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            interpreter: None,
            timeout_secs: 5,
        }
    }
}

impl ExecutorSettings {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Settings for the deduplicating grid sampler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerSettings {
    /// How many distinct grids to aim for per task.
    pub target_count: usize,
    /// First seed handed to the generator program.
    pub starting_seed: u64,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            target_count: 5,
            starting_seed: 42,
        }
    }
}

/// Filesystem layout of the pipeline's inputs and outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Directory of five-section description files, one per task id.
    pub descriptions_dir: PathBuf,
    /// Directory of trace JSON files, one per task id.
    pub traces_dir: PathBuf,
    /// Directory where accepted program sources are persisted.
    pub programs_dir: PathBuf,
    /// Directory where sampled grid pairs are persisted for inspection.
    pub grids_dir: PathBuf,
    /// Ground-truth mapping file (task id -> train/test examples).
    pub ground_truth: PathBuf,
    /// Batch report output file.
    pub report: PathBuf,
    /// Newline-delimited already-processed id set, for resumability.
    pub processed: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            descriptions_dir: PathBuf::from("descriptions"),
            traces_dir: PathBuf::from("traces"),
            programs_dir: PathBuf::from("programs"),
            grids_dir: PathBuf::from("grids"),
            ground_truth: PathBuf::from("data/training_challenges.json"),
            report: PathBuf::from("report.json"),
            processed: PathBuf::from("processed.txt"),
        }
    }
}

/// Top-level configuration for one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GridsmithConfig {
    pub synthesis: SynthesisSettings,
    pub executor: ExecutorSettings,
    pub sampler: SamplerSettings,
    pub paths: PathSettings,
}

impl GridsmithConfig {
    /// Load from an explicit path. A missing file yields the defaults; an
    /// unreadable or unparseable file is a fatal configuration error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load from the default location ([`config_path`]), falling back to
    /// defaults when no config dir exists.
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }
}

/// Default config file location: `<user config dir>/gridsmith/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gridsmith").join("config.toml"))
}
