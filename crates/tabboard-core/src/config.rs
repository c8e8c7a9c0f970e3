//! Application configuration management.
//!
//! Configuration holds the service API keys, an optional fixed location and
//! the background batch size. It is stored at
//! `~/.config/tabboard/config.json`; API keys may instead come from the
//! environment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::ApiKeys;
use crate::loader::DEFAULT_IMAGE_BATCH_SIZE;
use crate::models::Coordinates;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "tabboard";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Subdirectory of the cache dir holding durable storage
const PROFILE_DIR: &str = "profile";

/// Subdirectory of the cache dir holding session storage
const SESSION_DIR: &str = "session";

pub const OPENWEATHER_KEY_VAR: &str = "OPENWEATHER_API_KEY";
pub const API_NINJAS_KEY_VAR: &str = "API_NINJAS_KEY";
pub const UNSPLASH_KEY_VAR: &str = "UNSPLASH_API_KEY";

fn default_image_batch_size() -> usize {
    DEFAULT_IMAGE_BATCH_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub openweather_api_key: Option<String>,
    pub api_ninjas_key: Option<String>,
    pub unsplash_api_key: Option<String>,
    /// Position used for weather when none can be acquired
    pub location: Option<Coordinates>,
    #[serde(default = "default_image_batch_size")]
    pub image_batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openweather_api_key: None,
            api_ninjas_key: None,
            unsplash_api_key: None,
            location: None,
            image_batch_size: DEFAULT_IMAGE_BATCH_SIZE,
        }
    }
}

impl Config {
    /// Load from the default location, falling back to defaults when absent.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Durable storage location inside `cache_dir`.
    pub fn profile_dir(cache_dir: &Path) -> PathBuf {
        cache_dir.join(PROFILE_DIR)
    }

    /// Session storage location inside `cache_dir`.
    pub fn session_dir(cache_dir: &Path) -> PathBuf {
        cache_dir.join(SESSION_DIR)
    }

    /// API keys, with environment variables taking precedence over the file.
    pub fn api_keys(&self) -> ApiKeys {
        self.api_keys_with(|name| std::env::var(name).ok())
    }

    fn api_keys_with(&self, env: impl Fn(&str) -> Option<String>) -> ApiKeys {
        let pick = |var: &str, configured: &Option<String>| {
            env(var)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| configured.clone())
        };
        ApiKeys {
            openweather: pick(OPENWEATHER_KEY_VAR, &self.openweather_api_key),
            api_ninjas: pick(API_NINJAS_KEY_VAR, &self.api_ninjas_key),
            unsplash: pick(UNSPLASH_KEY_VAR, &self.unsplash_api_key),
        }
    }
}
