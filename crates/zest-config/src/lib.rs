//! Zest Configuration System
//!
//! Provides configuration for the zest test harness:
//! - Project configuration (zest.toml)
//! - Environment overrides (ZEST_*, NO_COLOR)
//! - Typed settings for report coloring and the test log threshold
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Project config (./zest.toml, searched upward)
//! 3. Environment variables (ZEST_COLOR, ZEST_LOG_LEVEL, NO_COLOR)
//! 4. CLI flags (applied by the harness)
//!
//! # Example
//!
//! ```no_run
//! use zest_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("{:?}", config.color_mode());
//! ```

pub mod loader;
pub mod project;
pub mod settings;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::{Config, ConfigLoader, CONFIG_FILE_NAME};
pub use project::ProjectConfig;
pub use settings::{ColorMode, LogLevel};
