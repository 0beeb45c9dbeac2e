//! Stage executor - runs the commands of a stage through a command executor

use crate::{
    core::{Command, PipelineContext, PipelineError},
    process::CommandExecutor,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Executes single commands and records their outcome on the command
pub struct StageExecutor<E> {
    executor: Arc<E>,
    command_timeout: Option<Duration>,
}

impl<E: CommandExecutor> StageExecutor<E> {
    pub fn new(executor: Arc<E>) -> Self {
        Self {
            executor,
            command_timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Run a command, storing its record on success and on non-zero exit
    ///
    /// Fails with [`PipelineError::Execution`] carrying the exit code when
    /// the command exits non-zero.
    pub async fn execute(
        &self,
        command: &mut Command,
        context: &PipelineContext,
    ) -> Result<(), PipelineError> {
        let argv = command.render(context);
        info!("$ {}", command.line);
        debug!("argv: {:?}", argv);

        let record = self
            .executor
            .run(&argv, &context.command_env(), self.command_timeout)
            .await?;

        let exit_code = record.exit_code;
        let stderr = record.stderr.clone();
        command.result = Some(record);

        if exit_code != 0 {
            return Err(PipelineError::Execution {
                command: command.line.clone(),
                exit_code,
                stderr,
            });
        }

        Ok(())
    }
}
