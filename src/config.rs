use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ExportError, Result};
use crate::exclusions::DEFAULT_EXCLUDE_TOKENS;

/// Largest `maxResults` Gmail accepts on `users.messages.list`
pub const MAX_PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Send the label filter on continuation pages too. Turning this off
    /// paginates without a label constraint after the first page.
    #[serde(default = "default_label_filter_on_every_page")]
    pub label_filter_on_every_page: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            user_id: default_user_id(),
            page_size: default_page_size(),
            max_concurrent_requests: default_max_concurrent(),
            max_retries: default_max_retries(),
            label_filter_on_every_page: default_label_filter_on_every_page(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_exclude_tokens")]
    pub exclude_tokens: Vec<String>,
    #[serde(default)]
    pub case_insensitive: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            exclude_tokens: default_exclude_tokens(),
            case_insensitive: false,
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("emails.xlsx")
}

fn default_user_id() -> String {
    "me".to_string()
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_max_concurrent() -> usize {
    40
}

fn default_max_retries() -> u32 {
    3
}

fn default_label_filter_on_every_page() -> bool {
    true
}

fn default_exclude_tokens() -> Vec<String> {
    DEFAULT_EXCLUDE_TOKENS.iter().map(|t| t.to_string()).collect()
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ExportError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ExportError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ExportError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ExportError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| ExportError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.export.page_size == 0 {
            return Err(ExportError::ConfigError(
                "export.page_size must be at least 1".to_string(),
            ));
        }
        if self.export.page_size > MAX_PAGE_SIZE {
            return Err(ExportError::ConfigError(format!(
                "export.page_size cannot exceed {} (Gmail API maximum)",
                MAX_PAGE_SIZE
            )));
        }

        // 50 concurrent 5-unit reads stays under the 250 units/sec user quota
        if self.export.max_concurrent_requests == 0 {
            return Err(ExportError::ConfigError(
                "export.max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.export.max_concurrent_requests > 50 {
            return Err(ExportError::ConfigError(
                "export.max_concurrent_requests cannot exceed 50 (to stay under Gmail API rate limits of 250 units/sec)".to_string(),
            ));
        }

        if self.export.max_retries > 10 {
            return Err(ExportError::ConfigError(
                "export.max_retries cannot exceed 10".to_string(),
            ));
        }

        if self.export.user_id.trim().is_empty() {
            return Err(ExportError::ConfigError(
                "export.user_id cannot be empty".to_string(),
            ));
        }

        if self.export.output_path.as_os_str().is_empty() {
            return Err(ExportError::ConfigError(
                "export.output_path cannot be empty".to_string(),
            ));
        }

        for token in &self.filter.exclude_tokens {
            if token.is_empty() {
                return Err(ExportError::ConfigError(
                    "filter.exclude_tokens cannot contain empty strings".to_string(),
                ));
            }
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        let config = Self::default();
        config.save(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.export.output_path, PathBuf::from("emails.xlsx"));
        assert_eq!(config.export.user_id, "me");
        assert_eq!(config.export.page_size, 500);
        assert_eq!(config.export.max_concurrent_requests, 40);
        assert_eq!(config.export.max_retries, 3);
        assert!(config.export.label_filter_on_every_page);

        assert_eq!(config.filter.exclude_tokens.len(), 6);
        assert!(config.filter.exclude_tokens.contains(&"noreply".to_string()));
        assert!(!config.filter.case_insensitive);
    }

    #[test]
    fn test_config_validation_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_page_size_zero() {
        let mut config = Config::default();
        config.export.page_size = 0;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("at least 1"));
    }

    #[test]
    fn test_config_validation_page_size_too_high() {
        let mut config = Config::default();
        config.export.page_size = 501;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("cannot exceed 500"));
    }

    #[test]
    fn test_config_validation_max_concurrent_bounds() {
        let mut config = Config::default();

        config.export.max_concurrent_requests = 0;
        assert!(config.validate().is_err());

        config.export.max_concurrent_requests = 51;
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("cannot exceed 50"));

        config.export.max_concurrent_requests = 1;
        assert!(config.validate().is_ok());

        config.export.max_concurrent_requests = 50;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_max_retries_too_high() {
        let mut config = Config::default();
        config.export.max_retries = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_empty_token() {
        let mut config = Config::default();
        config.filter.exclude_tokens.push(String::new());
        let result = config.validate();
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("exclude_tokens cannot contain empty strings"));
    }

    #[test]
    fn test_config_validation_empty_user_id() {
        let mut config = Config::default();
        config.export.user_id = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_config_load_save_roundtrip() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path();

        let mut config = Config::default();
        config.export.page_size = 100;
        config.filter.case_insensitive = true;
        config.save(path).await.unwrap();

        let loaded = Config::load(path).await.unwrap();
        assert_eq!(loaded.export.page_size, 100);
        assert!(loaded.filter.case_insensitive);
        assert_eq!(loaded.filter.exclude_tokens, config.filter.exclude_tokens);
    }

    #[tokio::test]
    async fn test_config_load_nonexistent_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let config = Config::load(&path).await.unwrap();
        assert_eq!(config.export.page_size, 500);
    }

    #[tokio::test]
    async fn test_config_load_invalid_toml() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "this is not valid toml {[}]")
            .await
            .unwrap();

        let result = Config::load(temp_file.path()).await;
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to parse config file"));
    }

    #[tokio::test]
    async fn test_config_partial_with_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        let partial_config = r#"
[export]
output_path = "out.csv"
label_filter_on_every_page = false

[filter]
exclude_tokens = ["promo"]
"#;
        tokio::fs::write(temp_file.path(), partial_config).await.unwrap();

        let config = Config::load(temp_file.path()).await.unwrap();

        assert_eq!(config.export.output_path, PathBuf::from("out.csv"));
        assert!(!config.export.label_filter_on_every_page);
        assert_eq!(config.filter.exclude_tokens, vec!["promo".to_string()]);

        assert_eq!(config.export.page_size, 500);
        assert_eq!(config.export.max_concurrent_requests, 40);
        assert!(!config.filter.case_insensitive);
    }

    #[tokio::test]
    async fn test_config_load_rejects_invalid_values() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "[export]\npage_size = 1000\n")
            .await
            .unwrap();

        assert!(Config::load(temp_file.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_config_create_example() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Config::create_example(&path).await.unwrap();
        assert!(path.exists());

        let config = Config::load(&path).await.unwrap();
        assert_eq!(config.export.user_id, "me");
    }
}
