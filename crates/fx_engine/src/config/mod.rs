//! Engine configuration
//!
//! Settings the host supplies at startup, loadable from TOML. The window
//! dimensions feed the pointer-to-NDC conversion the picking code depends on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration failed to parse
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Window settings consumed by picking and viewport-dependent math
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Backbuffer width in pixels
    pub width: u32,
    /// Backbuffer height in pixels
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Window settings
    #[serde(default)]
    pub window: WindowConfig,
}

impl EngineConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Load a configuration from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}
