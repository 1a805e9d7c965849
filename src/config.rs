use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::classifier::DEFAULT_PREFIX;
use crate::error::{RetentionError, Result};

/// Runtime configuration.
///
/// Retention rules are not configured here: they live in the mailbox as
/// label names.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub labels: LabelConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Parent label of the `KeepLast<N>` / `KeepDays<D>` rule labels
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
        }
    }
}

/// How selected messages are removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeletionMode {
    /// messages.delete, bypasses the trash
    #[default]
    Permanent,
    /// messages.trash, recoverable for 30 days
    Trash,
}

/// What to do when listing one label's messages fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ListingErrorPolicy {
    /// Abort the whole run before anything is deleted
    #[default]
    Abort,
    /// Skip the label and keep processing the others
    SkipLabel,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExecutionConfig {
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub deletion_mode: DeletionMode,
    #[serde(default)]
    pub on_listing_error: ListingErrorPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_user_id() -> String {
    "me".to_string()
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            RetentionError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            RetentionError::ConfigError(format!("Failed to parse config file: {}", e))
        })?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                RetentionError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            RetentionError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        tokio::fs::write(path, content).await.map_err(|e| {
            RetentionError::ConfigError(format!("Failed to write config file: {}", e))
        })?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.account.user_id.trim().is_empty() {
            return Err(RetentionError::ConfigError(
                "account.user_id cannot be empty".to_string(),
            ));
        }

        if self.labels.prefix.is_empty() {
            return Err(RetentionError::ConfigError(
                "labels.prefix cannot be empty".to_string(),
            ));
        }
        if self.labels.prefix.ends_with('/') {
            return Err(RetentionError::ConfigError(
                "labels.prefix cannot end with '/'".to_string(),
            ));
        }

        if self.client.max_retries > 10 {
            return Err(RetentionError::ConfigError(
                "client.max_retries cannot exceed 10".to_string(),
            ));
        }

        if self.client.request_timeout_secs == 0 {
            return Err(RetentionError::ConfigError(
                "client.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.client.request_timeout_secs > 300 {
            return Err(RetentionError::ConfigError(
                "client.request_timeout_secs cannot exceed 300".to_string(),
            ));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        Self::default().save(path).await
    }
}
