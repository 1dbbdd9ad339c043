use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::pipeline::Stage;

const CANDIDATES: [&str; 4] = [
    "storywriter.toml",
    "storywriter.json",
    "storywriter.yaml",
    "storywriter.yml",
];

/// Configuration file structure for storywriter.
///
/// Everything the pipeline needs (backend, per-agent models and prompts)
/// is resolved from here and handed to the orchestrator at construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Generation backend settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Agent models and prompts
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Output format preferences
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// `gh api` against the GitHub Models chat completions endpoint
    #[default]
    GithubModels,
    /// `gh copilot explain`
    Explain,
    /// Direct HTTPS call to an OpenAI-compatible endpoint
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BackendConfig {
    #[serde(default)]
    pub strategy: Strategy,

    /// Path or name of the `gh` executable
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Chat completions endpoint
    #[serde(default = "default_models_endpoint")]
    pub models_endpoint: String,

    /// Per-call timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Bearer token for the `http` strategy
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AgentConfig {
    /// Overrides `agents.default-model`
    pub model: Option<String>,

    /// Overrides the agent's built-in system prompt
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AgentsConfig {
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Stack traces longer than this are truncated before prompting
    #[serde(default = "default_max_stacktrace_chars")]
    pub max_stacktrace_chars: usize,

    #[serde(default)]
    pub technical_analyzer: AgentConfig,

    #[serde(default)]
    pub root_cause: AgentConfig,

    #[serde(default)]
    pub bug_writer: AgentConfig,

    #[serde(default)]
    pub story_writer: AgentConfig,

    #[serde(default)]
    pub severity: AgentConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Summary,
    Json,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            binary: default_binary(),
            models_endpoint: default_models_endpoint(),
            timeout_secs: default_timeout_secs(),
            token: None,
        }
    }
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            max_stacktrace_chars: default_max_stacktrace_chars(),
            technical_analyzer: AgentConfig::default(),
            root_cause: AgentConfig::default(),
            bug_writer: AgentConfig::default(),
            story_writer: AgentConfig::default(),
            severity: AgentConfig::default(),
        }
    }
}

fn default_binary() -> String {
    "gh".to_string()
}

fn default_models_endpoint() -> String {
    "https://models.inference.ai.azure.com/chat/completions".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_model() -> String {
    "gpt-4.1".to_string()
}

fn default_max_stacktrace_chars() -> usize {
    3000
}

impl AgentsConfig {
    pub fn agent(&self, stage: Stage) -> &AgentConfig {
        match stage {
            Stage::TechnicalAnalysis => &self.technical_analyzer,
            Stage::RootCause => &self.root_cause,
            Stage::BugWriter => &self.bug_writer,
            Stage::StoryWriter => &self.story_writer,
            Stage::Severity => &self.severity,
        }
    }

    /// Model for `stage`, falling back to the pipeline-wide default.
    pub fn model_for(&self, stage: Stage) -> &str {
        self.agent(stage)
            .model
            .as_deref()
            .unwrap_or(&self.default_model)
    }

    pub fn system_prompt_for(&self, stage: Stage) -> Option<&str> {
        self.agent(stage).system_prompt.as_deref()
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./storywriter.toml
    /// 3. ./storywriter.json
    /// 4. ./storywriter.yaml
    /// 5. ./storywriter.yml
    /// 6. `<user config dir>/storywriter/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            return Self::load_from_path(path);
        }

        let found = Self::find_in(Path::new(".")).or_else(|| {
            dirs::config_dir()
                .map(|dir| dir.join("storywriter").join("config.toml"))
                .filter(|path| path.exists())
        });

        match found {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    fn find_in(dir: &Path) -> Option<PathBuf> {
        CANDIDATES
            .iter()
            .map(|candidate| dir.join(candidate))
            .find(|path| path.exists())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => {
                // Try TOML first, then JSON, then YAML
                toml::from_str(&contents)
                    .or_else(|_| serde_json::from_str(&contents))
                    .or_else(|_| serde_yaml::from_str(&contents))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml" | "yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}
