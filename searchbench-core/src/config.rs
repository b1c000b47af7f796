use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::PerProvider;

/// Top-level configuration for searchbench
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Search provider endpoints and deadlines
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// LLM judge settings
    #[serde(default)]
    pub judge: JudgeConfig,
    /// Benchmark settings
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_str(&contents)
    }

    pub fn from_str(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject zero counts and zero deadlines
    pub fn validate(&self) -> Result<()> {
        for (id, deadline) in self.deadlines().iter() {
            if deadline.is_zero() {
                return Err(Error::Config(format!(
                    "providers.{id}.timeout_ms must be greater than 0"
                )));
            }
        }
        if self.judge.timeout_ms == 0 {
            return Err(Error::Config("judge.timeout_ms must be greater than 0".into()));
        }

        let benchmark = &self.benchmark;
        for (name, value) in [
            ("num_results", benchmark.num_results),
            ("suite_size", benchmark.suite_size),
            ("channel_capacity", benchmark.channel_capacity),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("benchmark.{name} must be at least 1")));
            }
        }
        Ok(())
    }

    /// Per-provider dispatch deadlines
    pub fn deadlines(&self) -> PerProvider<Duration> {
        PerProvider {
            parallel: Duration::from_millis(self.providers.parallel.timeout_ms),
            exa: Duration::from_millis(self.providers.exa.timeout_ms),
            openai: Duration::from_millis(self.providers.openai.timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub parallel: ParallelConfig,
    #[serde(default)]
    pub exa: ExaConfig,
    #[serde(default)]
    pub openai: OpenAiSearchConfig,
}

/// Parallel search API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// API key (falls back to PARALLEL_API_KEY env var)
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_parallel_url")]
    pub base_url: String,
    #[serde(default = "default_index_timeout")]
    pub timeout_ms: u64,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_parallel_url(),
            timeout_ms: default_index_timeout(),
        }
    }
}

/// Exa search API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExaConfig {
    /// API key (falls back to EXA_API_KEY env var)
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_exa_url")]
    pub base_url: String,
    #[serde(default = "default_index_timeout")]
    pub timeout_ms: u64,
}

impl Default for ExaConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_exa_url(),
            timeout_ms: default_index_timeout(),
        }
    }
}

/// OpenAI web search (generative) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiSearchConfig {
    /// API key (falls back to OPENAI_API_KEY env var)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Override for the OpenAI API base URL
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_search_model")]
    pub model: String,
    #[serde(default = "default_generative_timeout")]
    pub timeout_ms: u64,
}

impl Default for OpenAiSearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: default_search_model(),
            timeout_ms: default_generative_timeout(),
        }
    }
}

/// LLM judge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeConfig {
    /// API key (falls back to OPENAI_API_KEY env var)
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_judge_model")]
    pub model: String,
    /// Sampling temperature for accuracy judgments
    #[serde(default = "default_judge_temperature")]
    pub temperature: f32,
    /// Sampling temperature for query generation
    #[serde(default = "default_generation_temperature")]
    pub generation_temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_judge_timeout")]
    pub timeout_ms: u64,
    /// Who the search results are for, embedded in judge and generation prompts
    #[serde(default)]
    pub audience: Option<String>,
}

impl JudgeConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: default_judge_model(),
            temperature: default_judge_temperature(),
            generation_temperature: default_generation_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_judge_timeout(),
            audience: None,
        }
    }
}

/// Benchmark execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Results requested from each provider
    #[serde(default = "default_num_results")]
    pub num_results: usize,
    /// Default number of generated suite queries
    #[serde(default = "default_suite_size")]
    pub suite_size: usize,
    /// Buffered progress events before the producer waits on the consumer
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            num_results: default_num_results(),
            suite_size: default_suite_size(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_parallel_url() -> String {
    "https://api.parallel.ai".to_string()
}
fn default_exa_url() -> String {
    "https://api.exa.ai".to_string()
}
fn default_index_timeout() -> u64 {
    15_000
}
fn default_generative_timeout() -> u64 {
    20_000
}
fn default_judge_timeout() -> u64 {
    30_000
}
fn default_search_model() -> String {
    "gpt-4o-search-preview".to_string()
}
fn default_judge_model() -> String {
    "gpt-4o".to_string()
}
fn default_judge_temperature() -> f32 {
    0.3
}
fn default_generation_temperature() -> f32 {
    0.8
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_num_results() -> usize {
    10
}
fn default_suite_size() -> usize {
    10
}
fn default_channel_capacity() -> usize {
    32
}

/// Resolve an API key from config, then the environment.
///
/// Called at request time so a missing key fails the first call, not startup.
pub fn resolve_api_key(configured: Option<&str>, env_var: &'static str) -> Result<String> {
    configured
        .map(str::to_owned)
        .or_else(|| std::env::var(env_var).ok())
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or(Error::MissingCredentials(env_var))
}
