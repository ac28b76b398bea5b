//! Harness errors
//!
//! Test and hook failures never surface here; they become report lines.
//! These are the conditions that stop a run outright.

use std::collections::TryReserveError;
use std::io;
use thiserror::Error;
use zest_config::ConfigError;

#[derive(Error, Debug)]
pub enum RunError {
    /// The module registry could not grow
    #[error("failed to record module lifecycle state: {0}")]
    Bookkeeping(#[from] TryReserveError),

    #[error("failed to write test report: {0}")]
    Report(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

pub type RunResult<T> = Result<T, RunError>;
