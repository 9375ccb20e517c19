use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CompleteError, Result};

/// Root application configuration, loaded from `~/.config/objcomplete/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub endpoint: EndpointConfig,
}

/// How the bound input decides when to query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub min_length: usize,
    pub debounce_ms: u64,
    pub max_suggestions: usize,
    /// Only query text that starts like an oid prefix or a symbol name.
    /// Off by default: any text of `min_length` chars is eligible.
    pub syntax_gate: bool,
}

/// Where the lookup endpoint lives, relative to the page location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    pub base_path: String,
    pub endpoint: String,
    pub query_param: String,
    pub timeout_ms: u64,
    pub user_agent: String,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            min_length: 3,
            debounce_ms: 250,
            max_suggestions: 32,
            syntax_gate: false,
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            page_url: None,
            base_path: "/".to_string(),
            endpoint: "complete_object".to_string(),
            query_param: "text".to_string(),
            timeout_ms: 5000,
            user_agent: "objcomplete/0.1".to_string(),
        }
    }
}

impl InputConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl EndpointConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/objcomplete/config.toml`
    pub fn config_path() -> PathBuf {
        // Allow override via env var
        if let Ok(path) = std::env::var("OBJCOMPLETE_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("objcomplete")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard path.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.input.min_length == 0 {
            return Err(CompleteError::Config("input.min_length must be at least 1".into()));
        }
        if self.input.max_suggestions == 0 {
            return Err(CompleteError::Config("input.max_suggestions must be at least 1".into()));
        }
        if self.endpoint.endpoint.trim().is_empty() {
            return Err(CompleteError::Config("endpoint.endpoint is empty".into()));
        }
        if self.endpoint.query_param.trim().is_empty() {
            return Err(CompleteError::Config("endpoint.query_param is empty".into()));
        }
        Ok(())
    }
}
