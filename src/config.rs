use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::digest::{DEFAULT_RETENTION_DAYS, MAX_RETENTION_DAYS};
use crate::error::{AppError, Result};

const APP_DIR: &str = "weekly-digest";
const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// JSON snapshot of the digest map, rewritten after every refresh.
    #[serde(default = "default_state_path")]
    pub state_path: String,

    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub feeds: Vec<FeedSource>,

    /// Proxy URL prefixes, tried in order after the direct fetch fails.
    #[serde(default)]
    pub cors_proxies: Vec<String>,

    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    #[serde(default = "default_max_newsletter_items")]
    pub max_newsletter_items: usize,

    pub reference_link: Option<String>,
}

fn data_dir() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    std::fs::create_dir_all(&data_dir).ok();
    data_dir
}

fn default_db_path() -> String {
    data_dir().join("digest.db").to_string_lossy().to_string()
}

fn default_state_path() -> String {
    data_dir().join("digests.json").to_string_lossy().to_string()
}

fn default_model() -> String {
    "claude-3-5-haiku-20241022".to_string()
}

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

fn default_max_newsletter_items() -> usize {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            state_path: default_state_path(),
            api_key: None,
            model: default_model(),
            feeds: Vec::new(),
            cors_proxies: Vec::new(),
            retention_days: default_retention_days(),
            max_newsletter_items: default_max_newsletter_items(),
            reference_link: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.api_key = Some(key);
            }
        }

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.retention_days == 0 || self.retention_days > MAX_RETENTION_DAYS {
            return Err(AppError::InvalidInput(format!(
                "retention_days must be between 1 and {}",
                MAX_RETENTION_DAYS
            )));
        }
        if self.max_newsletter_items == 0 {
            return Err(AppError::InvalidInput(
                "max_newsletter_items must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }
}
