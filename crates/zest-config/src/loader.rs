//! Configuration Loader
//!
//! Handles loading configuration from zest.toml and applying environment overrides.

use crate::project::ProjectConfig;
use crate::settings::{ColorMode, LogLevel};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// File name searched for when loading project configuration
pub const CONFIG_FILE_NAME: &str = "zest.toml";

/// Configuration loader
///
/// Loads configuration with the following precedence:
/// 1. Project config (./zest.toml) - lowest priority
/// 2. Environment variables (ZEST_*, NO_COLOR) - overrides project
/// 3. CLI flags - highest priority (handled by caller)
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Skip environment overrides (used when the caller wants the file as written)
    ignore_env: bool,
}

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Project configuration, with environment overrides applied
    pub project: ProjectConfig,

    /// Directory where zest.toml was found
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { ignore_env: false }
    }

    /// Do not apply ZEST_* / NO_COLOR overrides
    pub fn without_env(mut self) -> Self {
        self.ignore_env = true;
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find zest.toml. A missing file is not
    /// an error: defaults are used.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;
        let project = self.apply_env_overrides(project_config)?;

        Ok(Config {
            project,
            project_root,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let project = self.apply_env_overrides(project_config)?;

        Ok(Config {
            project,
            project_root: config_path.parent().map(|p| p.to_path_buf()),
        })
    }

    /// Find project configuration by walking up directory tree
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.is_file() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Apply environment variable overrides to project config
    ///
    /// ZEST_COLOR=auto|always|never
    /// ZEST_LOG_LEVEL=off|error|warn|info|debug|trace
    /// NO_COLOR (any value) forces never, unless ZEST_COLOR is set
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if self.ignore_env {
            return Ok(config);
        }

        if let Ok(color) = env::var("ZEST_COLOR") {
            let mode = color.parse::<ColorMode>().map_err(|_| ConfigError::InvalidValue {
                field: "ZEST_COLOR".to_string(),
                reason: format!("must be 'auto', 'always', or 'never', got '{}'", color),
            })?;
            config.set_color_mode(mode);
        } else if env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()) {
            config.set_color_mode(ColorMode::Never);
        }

        if let Ok(level) = env::var("ZEST_LOG_LEVEL") {
            let level = level.parse::<LogLevel>().map_err(|e| match e {
                ConfigError::InvalidValue { reason, .. } => ConfigError::InvalidValue {
                    field: "ZEST_LOG_LEVEL".to_string(),
                    reason,
                },
                other => other,
            })?;
            config.set_log_level(level);
        }

        Ok(config)
    }
}

impl Config {
    /// Effective color mode (default: auto)
    pub fn color_mode(&self) -> ColorMode {
        self.project
            .color_mode()
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    /// Effective log threshold for test bodies (default: warn)
    pub fn log_level(&self) -> LogLevel {
        self.project.log_level().ok().flatten().unwrap_or_default()
    }

    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if a zest.toml was found
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }
}
