//! Project configuration file support for draftloops.
//!
//! Loads configuration from `draftloops.toml` in the working directory.
//! Credentials are environment-only and never read from the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The config file name
pub const CONFIG_FILE_NAME: &str = "draftloops.toml";

pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
pub const TAVILY_KEY_VAR: &str = "TAVILY_API_KEY";

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("missing required environment variables: {}", .missing.join(", "))]
    MissingCredentials { missing: Vec<String> },
}

/// Project-level configuration loaded from `draftloops.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Global default model (applies to both editor and judge)
    pub model: Option<String>,
    /// Editor/judge cycles before a run gives up
    pub max_iterations: Option<usize>,
    /// Editor-specific configuration
    #[serde(default)]
    pub editor: RoleConfig,
    /// Judge-specific configuration
    #[serde(default)]
    pub judge: RoleConfig,
    /// Research collection settings
    #[serde(default)]
    pub research: ResearchConfig,
    /// Directory layout overrides
    #[serde(default)]
    pub paths: PathsConfig,
    /// Event log settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration for a specific agent role (editor or judge)
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    /// Model to use for this role
    pub model: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ResearchConfig {
    /// How many ranked sources to keep per topic
    pub top_results: Option<usize>,
    /// Crawl depth: "basic" or "advanced"
    pub search_depth: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// Where intermediate stage snapshots land
    pub workproduct_dir: Option<PathBuf>,
    /// Where final documents land
    pub output_dir: Option<PathBuf>,
    /// Daily-rolling diagnostic log directory
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// JSONL file mirroring every pipeline event
    pub event_log: Option<PathBuf>,
}

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    /// Get the effective model for the editor role.
    /// Priority: [editor].model > global model > None
    pub fn editor_model(&self) -> Option<&str> {
        self.editor.model.as_deref().or(self.model.as_deref())
    }

    /// Get the effective model for the judge role.
    /// Priority: [judge].model > global model > None
    pub fn judge_model(&self) -> Option<&str> {
        self.judge.model.as_deref().or(self.model.as_deref())
    }
}

/// API credentials, read from the environment only.
pub struct Credentials {
    pub openai_api_key: String,
    pub tavily_api_key: String,
}

impl Credentials {
    /// Read both API keys, reporting every missing variable at once.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let openai = non_empty_var(OPENAI_KEY_VAR);
        let tavily = non_empty_var(TAVILY_KEY_VAR);

        match (openai, tavily) {
            (Some(openai_api_key), Some(tavily_api_key)) => Ok(Self {
                openai_api_key,
                tavily_api_key,
            }),
            (openai, tavily) => {
                let mut missing = Vec::new();
                if openai.is_none() {
                    missing.push(OPENAI_KEY_VAR.to_string());
                }
                if tavily.is_none() {
                    missing.push(TAVILY_KEY_VAR.to_string());
                }
                Err(ConfigurationError::MissingCredentials { missing })
            }
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}
