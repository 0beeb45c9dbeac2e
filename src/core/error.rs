//! Pipeline error taxonomy

use std::time::Duration;
use thiserror::Error;

/// Errors raised while running a pipeline
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// A service never passed its readiness check in time
    #[error("service '{service}' not ready after {}s ({attempts} attempts): {last_error}", timeout.as_secs())]
    ServiceUnavailable {
        service: String,
        timeout: Duration,
        attempts: usize,
        last_error: String,
    },

    /// A command terminated with a non-zero exit code
    #[error("command `{command}` exited with code {exit_code}")]
    Execution {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("command `{command}` timed out after {} seconds", timeout.as_secs())]
    CommandTimeout { command: String, timeout: Duration },

    #[error("failed to start `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    /// Coverage upload failure (never fatal)
    #[error("reporting failed: {0}")]
    Reporting(String),
}

impl PipelineError {
    /// Exit code carried by the error, if a process produced one
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            PipelineError::Execution { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}
