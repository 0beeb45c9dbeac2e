//! Subprocess execution for pipeline commands

pub mod config;
pub mod subprocess;

use crate::core::{CommandRecord, PipelineError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

pub use config::ExecutorConfig;
pub use subprocess::ProcessExecutor;

/// Trait for command execution - allows for different implementations
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run one argument vector to completion and capture its output
    ///
    /// A non-zero exit is still `Ok`; callers decide what a failure means.
    /// Errors are reserved for commands that could not run to completion.
    async fn run(
        &self,
        argv: &[String],
        env: &HashMap<String, String>,
        timeout: Option<Duration>,
    ) -> Result<CommandRecord, PipelineError>;
}

#[async_trait]
impl<E: CommandExecutor + ?Sized> CommandExecutor for std::sync::Arc<E> {
    async fn run(
        &self,
        argv: &[String],
        env: &HashMap<String, String>,
        timeout: Option<Duration>,
    ) -> Result<CommandRecord, PipelineError> {
        (**self).run(argv, env, timeout).await
    }
}
