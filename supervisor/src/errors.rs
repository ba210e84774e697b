//! Custom error types for the supervisor
//!
//! Provides structured error handling with context for the failure classes
//! that matter to the maintenance loop: settings handling, model-directory
//! allocation, the retraining job, and restart coordination.

use std::fmt;

/// Settings document error variants
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the settings document
    LoadFailed { path: String, reason: String },

    /// Settings document did not parse
    ParseError { path: String, reason: String },

    /// Failed to persist the settings document
    SaveFailed { path: String, reason: String },

    /// An experiment selected for retraining has no model directory
    MissingModelDir { abr_name: String },
}

/// No unused model directory name could be found under the probe ceiling
#[derive(Debug)]
pub struct AllocationError {
    pub parent_dir: String,
    pub prefix: String,
}

/// The retraining job exited nonzero
#[derive(Debug)]
pub struct JobFailure {
    pub cc: String,
    pub exit_code: i32,
    pub elapsed_secs: u64,
}

/// Restart coordination error variants; any of these is fatal to the program
#[derive(Debug)]
pub enum RestartError {
    /// The host service manager failed to restart a dependent service
    ServiceRestart { service: String, reason: String },

    /// Cleanup of transient media artifacts failed
    Cleanup { reason: String },

    /// The supervised process could not be launched
    Launch { reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::LoadFailed { path, reason } => {
                write!(f, "Failed to load settings from '{}': {}", path, reason)
            }
            ConfigError::ParseError { path, reason } => {
                write!(f, "Failed to parse settings '{}': {}", path, reason)
            }
            ConfigError::SaveFailed { path, reason } => {
                write!(f, "Failed to save settings to '{}': {}", path, reason)
            }
            ConfigError::MissingModelDir { abr_name } => {
                write!(f, "Experiment '{}' has no model_dir to retrain from", abr_name)
            }
        }
    }
}

impl fmt::Display for AllocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "No unused model directory name '{}-N' left under '{}'",
            self.prefix, self.parent_dir
        )
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Retraining job for '{}' exited with code {} after {}s",
            self.cc, self.exit_code, self.elapsed_secs
        )
    }
}

impl fmt::Display for RestartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartError::ServiceRestart { service, reason } => {
                write!(f, "Failed to restart service '{}': {}", service, reason)
            }
            RestartError::Cleanup { reason } => {
                write!(f, "Cleanup of transient media failed: {}", reason)
            }
            RestartError::Launch { reason } => {
                write!(f, "Failed to launch supervised process: {}", reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for AllocationError {}
impl std::error::Error for JobFailure {}
impl std::error::Error for RestartError {}
