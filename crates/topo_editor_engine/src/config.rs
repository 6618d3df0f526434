// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine configuration stored as RON.
//!
//! Every field has a default, so a config file only needs the values it
//! overrides:
//!
//! ```ron
//! (
//!     width: 1920,
//!     command: (max_stack_size: 200),
//! )
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default number of commands kept for undo
pub const DEFAULT_MAX_STACK_SIZE: usize = 500;

/// Canvas and command settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
    /// Canvas background color
    pub background_color: String,
    /// Undo/redo settings
    pub command: CommandConfig,
    /// Grid appearance
    pub grid: GridConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            background_color: "#1f1f1f".to_string(),
            command: CommandConfig::default(),
            grid: GridConfig::default(),
        }
    }
}

/// Undo/redo settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Undo, redo and jump become no-ops
    pub disabled: bool,
    /// Maximum undo stack length
    pub max_stack_size: usize,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            max_stack_size: DEFAULT_MAX_STACK_SIZE,
        }
    }
}

/// Grid appearance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Draw the grid
    pub visible: bool,
    /// Main line color
    pub color: String,
    /// Secondary line color
    pub sub_color: String,
    /// Secondary lines per main cell
    pub factor: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            visible: true,
            color: "#323232".to_string(),
            sub_color: "#262626".to_string(),
            factor: 4,
        }
    }
}

impl EngineConfig {
    /// Parse from RON text
    pub fn from_ron(s: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(s)?)
    }

    /// Load from a RON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&content)?;
        tracing::debug!(path = %path.display(), "Loaded engine config");
        Ok(config)
    }

    /// Serialize as pretty RON
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::default().struct_names(false);
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    /// Write to a RON file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = EngineConfig::from_ron("(width: 1920, command: (max_stack_size: 20))").unwrap();
        assert_eq!(config.width, 1920);
        assert_eq!(config.height, 720);
        assert_eq!(config.command.max_stack_size, 20);
        assert!(!config.command.disabled);
        assert!(config.grid.visible);
    }

    #[test]
    fn test_ron_roundtrip() {
        let mut config = EngineConfig::default();
        config.grid.factor = 8;
        config.command.disabled = true;
        let text = config.to_ron().unwrap();
        assert_eq!(EngineConfig::from_ron(&text).unwrap(), config);
    }

    #[test]
    fn test_malformed_config() {
        assert!(matches!(
            EngineConfig::from_ron("(width: \"wide\")"),
            Err(ConfigError::Ron(_))
        ));
    }
}
