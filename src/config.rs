//! Configuration loaded from YAML.
//!
//! Search order: explicit `--config` path, then
//! `~/.config/dynloop/dynloop.yml`, then `./dynloop.yml`, then defaults.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::DynloopError;
use crate::llm::OpenAIConfig;
use crate::llm::openai::{DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::registry::DEFAULT_REGISTRY_URL;
use crate::runner::{DEFAULT_MAX_ITERATIONS, RunnerConfig};
use crate::tools::{DEFAULT_BUILTINS, DEFAULT_LOCATION_URL};

/// System prompt used when the config does not set one
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant who can answer multistep questions by \
sequentially calling functions. Follow a pattern of THOUGHT (reason step-by-step about which function to call \
next), ACTION (call a function as a next step towards the final answer), OBSERVATION (output of the function). \
Reason step by step which actions to take to get to the answer. Follow the questions and tasks closely to best \
make the user satisfied. If you are unable to do something yourself, search the tool registry for tools that \
can extend your functionality. When you have the answer, call finish.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub registry: RegistryConfig,
    pub agent: AgentConfig,
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub max_tokens: u32,
    /// HTTP timeout for one completion request
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            max_tokens: 4096,
            timeout_ms: 120000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REGISTRY_URL.to_string(),
            timeout_ms: 30000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_iterations: u32,
    pub system_prompt: String,
    /// Bound on each non-interactive tool call; 0 disables it
    pub tool_timeout_ms: u64,
    /// Bound on each completion, on top of the HTTP timeout; 0 disables it
    pub turn_timeout_ms: u64,
    /// Built-in tools offered to the model
    pub builtins: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            tool_timeout_ms: 60000,
            turn_timeout_ms: 0,
            builtins: DEFAULT_BUILTINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub location_url: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            location_url: DEFAULT_LOCATION_URL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_name = env!("CARGO_PKG_NAME");

        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject settings the agent cannot run with
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.agent.max_iterations == 0 {
            return Err(DynloopError::Config("agent.max_iterations must be at least 1".to_string()));
        }
        if !self.registry.base_url.starts_with("http://") && !self.registry.base_url.starts_with("https://") {
            return Err(DynloopError::Config(format!(
                "registry.base_url must be an http(s) URL, got '{}'",
                self.registry.base_url
            )));
        }
        if !self.agent.builtins.iter().any(|b| b == "finish") {
            log::warn!("agent.builtins does not include 'finish'; runs can only end by budget exhaustion");
        }
        Ok(())
    }

    pub fn openai_config(&self) -> OpenAIConfig {
        OpenAIConfig {
            model: self.llm.model.clone(),
            base_url: self.llm.base_url.clone(),
            api_key_env: self.llm.api_key_env.clone(),
            max_tokens: self.llm.max_tokens,
            timeout: Duration::from_millis(self.llm.timeout_ms),
        }
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            max_iterations: self.agent.max_iterations,
            max_tokens: Some(self.llm.max_tokens),
            llm_timeout: non_zero_ms(self.agent.turn_timeout_ms),
        }
    }

    pub fn tool_timeout(&self) -> Option<Duration> {
        non_zero_ms(self.agent.tool_timeout_ms)
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_millis(self.registry.timeout_ms)
    }
}

fn non_zero_ms(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}
