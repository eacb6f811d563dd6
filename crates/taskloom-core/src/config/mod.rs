//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Taskloom configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    pub oracle: OracleConfig,
    pub expansion: ExpansionConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(skip)]
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Retries after the first attempt (at most one)
    pub max_retries: u32,
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpansionConfig {
    pub max_tasks: usize,
    pub min_subtasks: usize,
    pub max_subtasks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "anthropic/claude-3-5-haiku-latest".to_string(),
            temperature: 0.3,
            max_tokens: 4096,
            timeout_secs: 30,
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            cache_ttl_secs: 3600,
        }
    }
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            max_tasks: 10,
            min_subtasks: 3,
            max_subtasks: 7,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: crate::storage::database::default_database_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            oracle: OracleConfig::default(),
            expansion: ExpansionConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl LlmConfig {
    pub fn resolved_api_key(&self) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;

        Ok(env::var("TASKLOOM_API_KEY")
            .or_else(|_| env::var("OPENROUTER_API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty()))
    }

    pub fn redacted_api_key(&self) -> anyhow::Result<Option<String>> {
        self.resolved_api_key().map(|opt| {
            opt.map(|key| {
                if key.len() <= 4 {
                    "***".to_string()
                } else {
                    let suffix = &key[key.len() - 4..];
                    format!("***{}", suffix)
                }
            })
        })
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.api_key.is_some() {
            return Err(anyhow!(
                "LLM API keys must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("TASKLOOM_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("taskloom")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a file, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.llm.enforce_env_only()?;

        if self.oracle.max_retries > 1 {
            return Err(anyhow!("oracle.max_retries must be 0 or 1"));
        }
        if self.expansion.min_subtasks == 0
            || self.expansion.min_subtasks > self.expansion.max_subtasks
        {
            return Err(anyhow!(
                "expansion.min_subtasks must be between 1 and expansion.max_subtasks"
            ));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "llm.model" => Ok(self.llm.model.clone()),
            "llm.temperature" => Ok(self.llm.temperature.to_string()),
            "llm.max_tokens" => Ok(self.llm.max_tokens.to_string()),
            "llm.timeout_secs" => Ok(self.llm.timeout_secs.to_string()),

            "oracle.max_retries" => Ok(self.oracle.max_retries.to_string()),
            "oracle.cache_ttl_secs" => Ok(self.oracle.cache_ttl_secs.to_string()),

            "expansion.max_tasks" => Ok(self.expansion.max_tasks.to_string()),
            "expansion.min_subtasks" => Ok(self.expansion.min_subtasks.to_string()),
            "expansion.max_subtasks" => Ok(self.expansion.max_subtasks.to_string()),

            "storage.database_path" => Ok(self.storage.database_path.display().to_string()),

            // API key (special handling - show redacted)
            "llm.api_key" | "api_key" => match self.llm.redacted_api_key()? {
                Some(redacted) => Ok(redacted),
                None => Ok(
                    "(not set - use TASKLOOM_API_KEY or OPENROUTER_API_KEY env var)".to_string(),
                ),
            },

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `taskloom config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "llm.model" => {
                self.llm.model = value.to_string();
            }
            "llm.temperature" => {
                let temp: f32 = value
                    .parse()
                    .with_context(|| format!("Invalid temperature value: {}", value))?;
                if !(0.0..=2.0).contains(&temp) {
                    return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
                }
                self.llm.temperature = temp;
            }
            "llm.max_tokens" => {
                self.llm.max_tokens = value
                    .parse()
                    .with_context(|| format!("Invalid max_tokens value: {}", value))?;
            }
            "llm.timeout_secs" => {
                self.llm.timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
            }

            "oracle.max_retries" => {
                let retries: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid max_retries value: {}", value))?;
                if retries > 1 {
                    return Err(anyhow!("Oracle calls are retried at most once"));
                }
                self.oracle.max_retries = retries;
            }
            "oracle.cache_ttl_secs" => {
                self.oracle.cache_ttl_secs = value
                    .parse()
                    .with_context(|| format!("Invalid cache_ttl_secs value: {}", value))?;
            }

            "expansion.max_tasks" => {
                self.expansion.max_tasks = value
                    .parse()
                    .with_context(|| format!("Invalid max_tasks value: {}", value))?;
            }
            "expansion.min_subtasks" | "expansion.max_subtasks" => {
                let count: usize = value
                    .parse()
                    .with_context(|| format!("Invalid subtask count: {}", value))?;
                let mut candidate = self.expansion.clone();
                if key == "expansion.min_subtasks" {
                    candidate.min_subtasks = count;
                } else {
                    candidate.max_subtasks = count;
                }
                if candidate.min_subtasks == 0 || candidate.min_subtasks > candidate.max_subtasks {
                    return Err(anyhow!(
                        "Subtask bounds must satisfy 1 <= min_subtasks <= max_subtasks"
                    ));
                }
                self.expansion = candidate;
            }

            "storage.database_path" => {
                self.storage.database_path = PathBuf::from(value);
            }

            // API key cannot be set via config
            "llm.api_key" | "api_key" => {
                return Err(anyhow!(
                    "API keys cannot be stored in configuration for security. \
                     Set the TASKLOOM_API_KEY or OPENROUTER_API_KEY environment variable instead."
                ));
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `taskloom config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = vec![
            "llm.model",
            "llm.temperature",
            "llm.max_tokens",
            "llm.timeout_secs",
            "llm.api_key",
            "oracle.max_retries",
            "oracle.cache_ttl_secs",
            "expansion.max_tasks",
            "expansion.min_subtasks",
            "expansion.max_subtasks",
            "storage.database_path",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.llm.timeout_secs, 30);
        assert_eq!(config.oracle.max_retries, 1);
        assert_eq!(config.expansion.min_subtasks, 3);
        assert_eq!(config.expansion.max_subtasks, 7);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("llm.model", "openai/gpt-4o").unwrap();
        config.set("expansion.max_tasks", "4").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.llm.model, "openai/gpt-4o");
        assert_eq!(loaded.expansion.max_tasks, 4);
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.expansion.max_tasks, 10);
    }

    #[test]
    fn test_set_rejects_api_key() {
        let mut config = Config::default();
        assert!(config.set("llm.api_key", "sk-123").is_err());
    }

    #[test]
    fn test_set_rejects_second_retry() {
        let mut config = Config::default();
        assert!(config.set("oracle.max_retries", "2").is_err());
        config.set("oracle.max_retries", "0").unwrap();
        assert_eq!(config.oracle.max_retries, 0);
    }

    #[test]
    fn test_subtask_bounds_are_checked() {
        let mut config = Config::default();
        assert!(config.set("expansion.min_subtasks", "9").is_err());
        assert!(config.set("expansion.max_subtasks", "2").is_err());
        config.set("expansion.max_subtasks", "5").unwrap();
        assert_eq!(config.expansion.max_subtasks, 5);
    }

    #[test]
    fn test_unknown_key() {
        let config = Config::default();
        assert!(config.get("nope").is_err());
    }

    #[test]
    fn test_list_contains_all_sections() {
        let config = Config::default();
        let listed = config.list().unwrap();
        let keys: Vec<&str> = listed.iter().map(|(k, _)| k.as_str()).collect();
        assert!(keys.contains(&"llm.model"));
        assert!(keys.contains(&"oracle.cache_ttl_secs"));
        assert!(keys.contains(&"expansion.max_tasks"));
        assert!(keys.contains(&"storage.database_path"));
    }

    #[test]
    fn test_stored_api_key_fails_validation() {
        let mut config = Config::default();
        config.llm.api_key = Some("secret".to_string());
        assert!(config.validate().is_err());
    }
}
