use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BatchError, Result};

pub const RESULTS_EXTENSION: &str = ".json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub system_msg: String,
    pub model_name: String,
    pub save_every: usize,
    pub delay: f64,
    pub max_trials: u32,
    pub temperature: f32,
    pub max_token: u32,
    pub seed: u64,
    pub budget: Option<usize>,
    pub shuffle_data_before_generate: bool,
    pub debug_mode: Option<usize>,
    pub overwrite: bool,
    pub results_json_path: PathBuf,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            system_msg: "You are a helpful assistant.".to_string(),
            model_name: "gpt-3.5-turbo-0613".to_string(),
            save_every: 50,
            delay: 1.0,
            max_trials: 10,
            temperature: 0.0,
            max_token: 1024,
            seed: 0,
            budget: None,
            shuffle_data_before_generate: false,
            debug_mode: None,
            overwrite: false,
            results_json_path: PathBuf::new(),
        }
    }
}

impl JobConfig {
    pub fn new(results_json_path: impl Into<PathBuf>) -> Self {
        Self {
            results_json_path: results_json_path.into(),
            ..Self::default()
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay.max(0.0))
    }

    pub fn validate(&self) -> Result<()> {
        let path = self.results_json_path.to_string_lossy();
        if !path.ends_with(RESULTS_EXTENSION) {
            return Err(BatchError::Configuration(format!(
                "results_json_path must end with {RESULTS_EXTENSION}, got {path:?}"
            )));
        }
        if self.save_every == 0 {
            return Err(BatchError::Configuration(
                "save_every must be at least 1".to_string(),
            ));
        }
        if self.max_trials == 0 {
            return Err(BatchError::Configuration(
                "max_trials must be at least 1".to_string(),
            ));
        }
        if !self.delay.is_finite() || self.delay < 0.0 {
            return Err(BatchError::Configuration(format!(
                "delay must be a non-negative number of seconds, got {}",
                self.delay
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateConfig {
    pub prompts: Vec<String>,
    #[serde(flatten)]
    pub job: JobConfig,
}

impl GenerateConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|err| {
            BatchError::Configuration(format!("cannot read config {path:?}: {err}"))
        })?;
        let config: GenerateConfig = serde_json::from_str(&data).map_err(|err| {
            BatchError::Configuration(format!("invalid config {path:?}: {err}"))
        })?;
        if config.prompts.is_empty() {
            return Err(BatchError::Configuration(format!(
                "config {path:?} lists no prompts"
            )));
        }
        config.job.validate()?;
        Ok(config)
    }

    pub fn prompt_paths(&self, prompts_dir: impl AsRef<Path>) -> Vec<PathBuf> {
        let dir = prompts_dir.as_ref();
        self.prompts.iter().map(|name| dir.join(name)).collect()
    }
}
