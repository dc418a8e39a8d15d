use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Directory holding the tokenizer and model artifacts, resolved next to the
/// running executable unless `model.path` is set.
pub const MODEL_DIR_NAME: &str = "t5-grammar-correction-model";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub logs: LogsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub device: DevicePreference,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevicePreference {
    /// First available accelerator, falling back to the CPU.
    #[default]
    Auto,
    Cpu,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_task_prefix")]
    pub task_prefix: String,
    #[serde(default = "default_token_limit")]
    pub max_input_tokens: usize,
    #[serde(default = "default_token_limit")]
    pub max_output_tokens: usize,
    #[serde(default = "default_num_beams")]
    pub num_beams: usize,
    #[serde(default = "default_early_stopping")]
    pub early_stopping: bool,
    #[serde(default = "default_length_penalty")]
    pub length_penalty: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let generation = &self.generation;
        if generation.num_beams == 0 {
            return Err(Error::config("generation.num_beams must be at least 1"));
        }
        if generation.max_input_tokens == 0 || generation.max_output_tokens == 0 {
            return Err(Error::config("generation token limits must be at least 1"));
        }
        if self.inference.max_concurrent_jobs == 0 {
            return Err(Error::config(
                "inference.max_concurrent_jobs must be at least 1",
            ));
        }
        if self.inference.timeout_secs == 0 {
            return Err(Error::config("inference.timeout_secs must be at least 1"));
        }
        Ok(())
    }
}

impl ModelConfig {
    /// Returns the configured model directory, or `MODEL_DIR_NAME` beside the
    /// current executable.
    pub fn resolve_dir(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        let exe = std::env::current_exe()?;
        let parent = exe
            .parent()
            .ok_or_else(|| Error::config("executable path has no parent directory"))?;
        Ok(parent.join(MODEL_DIR_NAME))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            logs: LogsConfig::default(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            task_prefix: default_task_prefix(),
            max_input_tokens: default_token_limit(),
            max_output_tokens: default_token_limit(),
            num_beams: default_num_beams(),
            early_stopping: default_early_stopping(),
            length_penalty: default_length_penalty(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_task_prefix() -> String {
    "grammar: ".to_string()
}

fn default_token_limit() -> usize {
    128
}

fn default_num_beams() -> usize {
    5
}

fn default_early_stopping() -> bool {
    true
}

fn default_length_penalty() -> f32 {
    1.0
}

fn default_max_concurrent_jobs() -> usize {
    2
}

fn default_timeout_secs() -> u64 {
    120
}
