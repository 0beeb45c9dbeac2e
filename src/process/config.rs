//! Executor configuration

use std::path::PathBuf;

/// Configuration for the process executor
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// Directory commands run in; the current directory when unset
    pub working_dir: Option<PathBuf>,
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}
