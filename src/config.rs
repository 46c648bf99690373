use crate::error::{ExportError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding the ClickUp API token. The token never
/// lives in the config file; `.env` files are supported via dotenv.
pub const API_TOKEN_ENV: &str = "CLICKUP_API_TOKEN";

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub clickup: ClickUpConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

#[derive(Debug, Deserialize)]
pub struct ClickUpConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub list_id: String,
}

fn default_base_url() -> String {
    "https://api.clickup.com/api/v2".to_string()
}

impl Default for ClickUpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            list_id: String::new(),
        }
    }
}

/// Adaptive backoff policy for HTTP 429 responses.
#[derive(Debug, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}
fn default_initial_delay_ms() -> u64 {
    1000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// Static pause between tasks. Independent of the 429 backoff policy.
    #[serde(default = "default_task_throttle_ms")]
    pub task_throttle_ms: u64,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("clickup_comments_export.csv")
}
fn default_task_throttle_ms() -> u64 {
    500
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            task_throttle_ms: default_task_throttle_ms(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ExportError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.clickup.base_url.trim().is_empty() {
            return Err(ExportError::Config(
                "clickup.base_url must not be empty".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ExportError::Config(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Reads the ClickUp API token from the environment.
    pub fn api_token() -> Result<String> {
        match std::env::var(API_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => Err(ExportError::Config(format!(
                "{} is not set; the export pipeline requires a ClickUp API token",
                API_TOKEN_ENV
            ))),
        }
    }
}
