//! Configuration file handling

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Scan defaults
    #[serde(default)]
    pub settings: Settings,

    /// Default RPC endpoint
    #[serde(default)]
    pub rpc_url: Option<String>,

    /// Directory for checkpoint files
    #[serde(default)]
    pub checkpoint_dir: Option<PathBuf>,
}

/// Scan defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Blocks per getLogs window
    #[serde(default = "default_window_size")]
    pub window_size: u64,

    /// Concurrent window fetches
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Aggregate requests per second
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Max retry attempts per window span
    #[serde(default = "default_retries")]
    pub retry_attempts: u32,
}

fn default_window_size() -> u64 {
    2_000
}

fn default_concurrency() -> usize {
    4
}

fn default_requests_per_second() -> u32 {
    10
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            concurrency: default_concurrency(),
            requests_per_second: default_requests_per_second(),
            timeout_seconds: default_timeout(),
            retry_attempts: default_retries(),
        }
    }
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("token-flow")
            .join("config.toml")
    }

    /// Load from default path
    pub fn load_default() -> Result<Option<Self>> {
        let path = Self::default_path();
        if path.exists() {
            Ok(Some(Self::load(&path)?))
        } else {
            Ok(None)
        }
    }

    /// Load from a specific path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::InvalidFile(format!("{}: {}", path.display(), e)))?;

        let config: Self = toml::from_str(&content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Save to a specific path
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::InvalidFile(format!("Failed to create directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidFile(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::InvalidFile(format!("Failed to write config: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
rpc_url = "https://example.com/rpc"

[settings]
window_size = 500
concurrency = 2
requests_per_second = 5
"#;

        let config: ConfigFile = toml::from_str(toml).unwrap();
        assert_eq!(config.settings.window_size, 500);
        assert_eq!(config.settings.concurrency, 2);
        assert_eq!(config.settings.requests_per_second, 5);
        assert_eq!(config.settings.timeout_seconds, 30);
        assert_eq!(config.rpc_url.as_deref(), Some("https://example.com/rpc"));
    }

    #[test]
    fn test_default_path() {
        let path = ConfigFile::default_path();
        assert!(path.to_string_lossy().contains("token-flow"));
    }
}
