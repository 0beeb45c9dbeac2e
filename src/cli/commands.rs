//! CLI command definitions

use crate::process::ExecutorConfig;
use clap::Args;
use std::path::PathBuf;

/// Run a pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Environment overrides (KEY=VALUE)
    #[arg(long, value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Skip the coverage upload
    #[arg(long)]
    pub no_report: bool,

    /// Directory commands run in and the coverage artifact is read from
    #[arg(long)]
    pub workdir: Option<PathBuf>,
}

impl RunCommand {
    /// Executor settings derived from the command line
    pub fn executor_config(&self) -> ExecutorConfig {
        match &self.workdir {
            Some(dir) => ExecutorConfig::new().with_working_dir(dir),
            None => ExecutorConfig::new(),
        }
    }
}

/// Validate a pipeline configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Print the execution plan of a pipeline
#[derive(Debug, Args, Clone)]
pub struct PlanCommand {
    /// Path to pipeline YAML file
    #[arg(short, long)]
    pub file: String,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Invalid key=value pair: {}", s)),
    }
}
