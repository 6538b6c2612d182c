//! Startup configuration.
//!
//! Sources, highest priority first:
//! 1. Environment variables prefixed `QUERYBRIDGE_` (`__` separates sections,
//!    e.g. `QUERYBRIDGE_LLM__MODEL`)
//! 2. The TOML file named by `QUERYBRIDGE_CONFIG`, or `querybridge.toml`
//! 3. Built-in defaults
//!
//! The resulting [`AppConfig`] is built once and handed to each component.

use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::infrastructure::security::keyring::KeyringManager;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const ENV_PREFIX: &str = "QUERYBRIDGE_";
const ENV_CONFIG_FILE: &str = "QUERYBRIDGE_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "querybridge.toml";
const KEYRING_SERVICE: &str = "querybridge";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("company.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    pub dir: PathBuf,
    /// File-name prefix for snapshots (`<prefix>_<YYYYmmdd-HHMMSS>.db`).
    pub prefix: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("backups"),
            prefix: "company".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub llm: LLMConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            backup: BackupConfig::default(),
            llm: LLMConfig::default(),
            server: ServerConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Loads `.env`, extracts the figment chain and resolves the API key reference.
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config: AppConfig = Self::figment().extract()?;
        config.llm.api_key = match config.llm.api_key.as_deref() {
            Some(reference) if !reference.trim().is_empty() => {
                Some(resolve_secret(reference.trim())?)
            }
            _ => None,
        };
        Ok(config)
    }

    pub fn figment() -> Figment {
        let config_file = std::env::var(ENV_CONFIG_FILE)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if config_file.exists() {
            figment = figment.merge(Toml::file(config_file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

/// Resolves a secret reference.
///
/// - `env:NAME` reads the environment variable `NAME`
/// - `keychain:NAME` reads the OS keychain entry `NAME`
/// - `plain:VALUE` returns `VALUE`
/// - anything else is taken literally
pub fn resolve_secret(reference: &str) -> Result<String> {
    if let Some(env_key) = reference.strip_prefix("env:") {
        std::env::var(env_key).map_err(|_| {
            AppError::ConfigError(format!(
                "Environment variable '{}' not found for API key",
                env_key
            ))
        })
    } else if let Some(key_name) = reference.strip_prefix("keychain:") {
        KeyringManager::new(KEYRING_SERVICE).get_secret(key_name)
    } else if let Some(value) = reference.strip_prefix("plain:") {
        Ok(value.to_string())
    } else {
        Ok(reference.to_string())
    }
}
