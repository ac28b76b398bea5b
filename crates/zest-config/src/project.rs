//! Project Configuration (zest.toml)
//!
//! Handles project-level configuration stored in `zest.toml` at the project root.

use crate::settings::{ColorMode, LogLevel};
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Project configuration from zest.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Report rendering options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReportConfig>,

    /// Log capture options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<LogConfig>,
}

/// Report configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// Color mode ("auto", "always", "never")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Log capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Threshold for log output while a test runs (default: "warn")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        self.color_mode()?;
        self.log_level()?;
        Ok(())
    }

    /// Configured color mode, if present
    pub fn color_mode(&self) -> ConfigResult<Option<ColorMode>> {
        self.report
            .as_ref()
            .and_then(|r| r.color.as_deref())
            .map(|color| {
                color.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "report.color".to_string(),
                    reason: format!(
                        "must be one of {}, got '{}'",
                        ColorMode::VARIANTS.join(", "),
                        color
                    ),
                })
            })
            .transpose()
    }

    /// Configured log threshold, if present
    pub fn log_level(&self) -> ConfigResult<Option<LogLevel>> {
        self.log
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .map(str::parse)
            .transpose()
    }

    /// Set the color mode, creating the section if needed
    pub fn set_color_mode(&mut self, mode: ColorMode) {
        self.report.get_or_insert_with(Default::default).color = Some(mode.to_string());
    }

    /// Set the log threshold, creating the section if needed
    pub fn set_log_level(&mut self, level: LogLevel) {
        self.log.get_or_insert_with(Default::default).level = Some(level.to_string());
    }
}
