use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generator::{BASE_COLORS, MAX_COLORS, colors_for_level_with};
use crate::model::COLOR_NAMES;
use crate::session::SessionOptions;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "WATER_SORT_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "water_sort.toml";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Game settings. Every field has a default, so a partial file is fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Packets per container.
    pub capacity: usize,
    /// Colors on level 0.
    pub base_colors: usize,
    /// Upper bound on colors as levels go up.
    pub max_colors: usize,
    /// Pour animation length. Zero disables the settle guard.
    pub settle_delay_ms: u64,
    pub history_limit: Option<usize>,
    /// Show the tutorial until it has been completed once.
    pub tutorial: bool,
    /// Fixed RNG seed for reproducible levels.
    pub seed: Option<u64>,
    pub progress_path: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            capacity: 4,
            base_colors: BASE_COLORS,
            max_colors: MAX_COLORS,
            settle_delay_ms: 400,
            history_limit: None,
            tutorial: true,
            seed: None,
            progress_path: PathBuf::from("water_sort_progress.toml"),
        }
    }
}

impl GameConfig {
    /// `$WATER_SORT_CONFIG` if set, otherwise `water_sort.toml` in the
    /// working directory.
    pub fn config_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Loads configuration from the default config file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Loads and validates `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: GameConfig = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |message: String| Err(ConfigError::ValidationError { message });

        if self.capacity == 0 {
            return fail("capacity must be at least 1".to_string());
        }
        if self.base_colors == 0 {
            return fail("base_colors must be at least 1".to_string());
        }
        if self.max_colors < self.base_colors {
            return fail(format!(
                "max_colors ({}) is smaller than base_colors ({})",
                self.max_colors, self.base_colors
            ));
        }
        if self.max_colors > COLOR_NAMES.len() {
            return fail(format!(
                "max_colors ({}) exceeds the palette of {} colors",
                self.max_colors,
                COLOR_NAMES.len()
            ));
        }
        if self.history_limit == Some(0) {
            return fail("history_limit must be at least 1 when set".to_string());
        }
        Ok(())
    }

    pub fn colors_for_level(&self, level: u32) -> usize {
        colors_for_level_with(level, self.base_colors, self.max_colors)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            settle: self.settle_delay_ms > 0,
            history_limit: self.history_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GameConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.colors_for_level(0), 3);
        assert_eq!(config.colors_for_level(20), 6);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "capacity = 5\nsettle_delay_ms = 0\nseed = 9").unwrap();
        let config = GameConfig::load_from(file.path()).unwrap();
        assert_eq!(config.capacity, 5);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.max_colors, MAX_COLORS);
        assert!(!config.session_options().settle);
    }

    #[test]
    fn parse_errors_name_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "capacity = \"four\"").unwrap();
        let err = GameConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let config = GameConfig {
            max_colors: 2,
            ..GameConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError { .. })
        ));

        let config = GameConfig {
            history_limit: Some(0),
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());

        let config = GameConfig {
            capacity: 0,
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
