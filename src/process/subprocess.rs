//! Subprocess executor - runs commands as child processes

use crate::core::{CommandRecord, PipelineError};
use crate::process::{CommandExecutor, ExecutorConfig};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Executes commands in fresh subprocesses
///
/// Children inherit our environment plus the variables passed per call,
/// get a closed stdin, and have stdout and stderr captured.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    config: ExecutorConfig,
}

impl ProcessExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn run(
        &self,
        argv: &[String],
        env: &HashMap<String, String>,
        limit: Option<Duration>,
    ) -> Result<CommandRecord, PipelineError> {
        let line = argv.join(" ");
        let (program, args) = argv.split_first().ok_or_else(|| PipelineError::Spawn {
            command: line.clone(),
            reason: "empty argument vector".to_string(),
        })?;

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command.envs(env);
        if let Some(ref dir) = self.config.working_dir {
            command.current_dir(dir);
        }

        debug!("Spawning `{}`", line);
        let started_at = Utc::now();
        let clock = Instant::now();

        let output = match limit {
            Some(limit) => timeout(limit, command.output())
                .await
                .map_err(|_| PipelineError::CommandTimeout {
                    command: line.clone(),
                    timeout: limit,
                })?,
            None => command.output().await,
        }
        .map_err(|e| PipelineError::Spawn {
            command: line.clone(),
            reason: e.to_string(),
        })?;

        // Killed by a signal: no exit code
        let exit_code = output.status.code().unwrap_or(-1);
        if exit_code != 0 {
            warn!("`{}` exited with code {}", line, exit_code);
        }

        let record = CommandRecord {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
        };

        debug!(
            "`{}` finished in {}ms with {} bytes of output",
            line,
            record.duration_ms,
            record.stdout.len()
        );

        Ok(record)
    }
}
