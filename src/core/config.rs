//! Pipeline configuration from YAML

use crate::core::{command::Command, Pipeline, StageName};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;

const DEFAULT_SERVICE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_SERVICE_INTERVAL_SECS: u64 = 5;
const MAX_SERVICE_WAIT_SECS: u64 = 24 * 60 * 60;

/// A command as written in the descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    /// A single line, split into words
    Line(String),
    /// An explicit argument vector
    Argv(Vec<String>),
}

impl CommandSpec {
    pub fn to_command(&self) -> Result<Command> {
        let command = match self {
            CommandSpec::Line(line) => Command::parse(line),
            CommandSpec::Argv(argv) => Command::from_argv(argv),
        };
        command.with_context(|| format!("Invalid command: {}", self))
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandSpec::Line(line) => f.write_str(line),
            CommandSpec::Argv(argv) => write!(f, "{:?}", argv),
        }
    }
}

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Language the project is written in (informational)
    #[serde(default)]
    pub language: Option<String>,

    /// Runtime version (informational)
    #[serde(default)]
    pub runtime: Option<String>,

    /// Environment injected into every command; a mapping or a list of KEY=VALUE
    #[serde(default)]
    env: Option<Value>,

    /// Timeout applied to each command (in seconds)
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,

    /// Background services the script stage depends on
    #[serde(default)]
    pub services: Vec<ServiceConfig>,

    #[serde(default)]
    pub before_install: Vec<CommandSpec>,

    #[serde(default)]
    pub install: Vec<CommandSpec>,

    #[serde(default)]
    pub script: Vec<CommandSpec>,

    #[serde(default)]
    pub after_success: Vec<CommandSpec>,

    #[serde(default)]
    pub after_failure: Vec<CommandSpec>,

    /// Coverage reporting settings
    #[serde(default)]
    pub coverage: Option<CoverageConfig>,
}

/// A background service declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Unique service name
    pub name: String,

    /// Command that brings the service up
    #[serde(default)]
    pub start: Option<CommandSpec>,

    /// Command that tears the service down
    #[serde(default)]
    pub stop: Option<CommandSpec>,

    /// How to tell the service is usable
    pub readiness: ReadinessConfig,

    /// Give up waiting after this many seconds
    #[serde(default = "default_service_timeout")]
    pub timeout_secs: u64,

    /// Seconds between readiness checks
    #[serde(default = "default_service_interval")]
    pub interval_secs: u64,
}

/// Readiness check configuration; exactly one field must be set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadinessConfig {
    #[serde(default)]
    pub http: Option<HttpProbeConfig>,

    #[serde(default)]
    pub command: Option<CommandSpec>,
}

/// HTTP readiness probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpProbeConfig {
    pub url: String,

    #[serde(default)]
    pub method: ProbeMethod,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    #[default]
    Head,
    Get,
}

impl ProbeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeMethod::Head => "HEAD",
            ProbeMethod::Get => "GET",
        }
    }
}

/// Coverage upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageConfig {
    /// File produced by the script stage
    pub artifact: String,

    /// Endpoint receiving the upload
    pub endpoint: String,

    /// Name of the environment variable holding the upload token
    #[serde(default)]
    pub token_env: Option<String>,
}

fn default_service_timeout() -> u64 {
    DEFAULT_SERVICE_TIMEOUT_SECS
}

fn default_service_interval() -> u64 {
    DEFAULT_SERVICE_INTERVAL_SECS
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Commands declared for a stage
    pub fn stage_commands(&self, stage: StageName) -> &[CommandSpec] {
        match stage {
            StageName::BeforeInstall => &self.before_install,
            StageName::Install => &self.install,
            StageName::Script => &self.script,
            StageName::AfterSuccess => &self.after_success,
            StageName::AfterFailure => &self.after_failure,
        }
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Pipeline name must not be empty");
        }

        if self.script.is_empty() {
            anyhow::bail!("Pipeline '{}' declares no script commands", self.name);
        }

        for stage in StageName::ALL {
            for spec in self.stage_commands(stage) {
                spec.to_command()
                    .with_context(|| format!("In stage '{}'", stage))?;
            }
        }

        if self.command_timeout_secs == Some(0) {
            anyhow::bail!("command_timeout_secs must be greater than zero");
        }

        self.get_env()?;

        let mut seen_services = HashSet::new();
        for service in &self.services {
            if !seen_services.insert(&service.name) {
                anyhow::bail!("Duplicate service name: {}", service.name);
            }
            service
                .validate()
                .with_context(|| format!("In service '{}'", service.name))?;
        }

        if let Some(coverage) = &self.coverage {
            if coverage.artifact.trim().is_empty() {
                anyhow::bail!("Coverage artifact path must not be empty");
            }
            reqwest::Url::parse(&coverage.endpoint)
                .with_context(|| format!("Invalid coverage endpoint: {}", coverage.endpoint))?;
        }

        Ok(())
    }

    /// Get the environment as a string map
    pub fn get_env(&self) -> Result<HashMap<String, String>> {
        let mut env = HashMap::new();

        match &self.env {
            None | Some(Value::Null) => {}
            Some(Value::Mapping(map)) => {
                for (key, value) in map {
                    let key = key
                        .as_str()
                        .with_context(|| format!("Environment key must be a string: {:?}", key))?;
                    env.insert(key.to_string(), scalar_to_string(value));
                }
            }
            Some(Value::Sequence(entries)) => {
                // Travis-style list of KEY=VALUE entries
                for entry in entries {
                    let entry = scalar_to_string(entry);
                    let (key, value) = entry
                        .split_once('=')
                        .with_context(|| format!("Invalid environment entry: {}", entry))?;
                    env.insert(key.trim().to_string(), value.to_string());
                }
            }
            Some(other) => {
                anyhow::bail!("env must be a mapping or a list, got {:?}", other);
            }
        }

        Ok(env)
    }

    /// Convert config to a Pipeline domain model
    pub fn to_pipeline(&self) -> Result<Pipeline> {
        Pipeline::from_config(self)
    }
}

impl ServiceConfig {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Service name must not be empty");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        if self.interval_secs == 0 {
            anyhow::bail!("interval_secs must be greater than zero");
        }
        if self.timeout_secs > MAX_SERVICE_WAIT_SECS || self.interval_secs > MAX_SERVICE_WAIT_SECS {
            anyhow::bail!(
                "timeout_secs and interval_secs must not exceed {} seconds",
                MAX_SERVICE_WAIT_SECS
            );
        }
        for spec in self.start.iter().chain(self.stop.iter()) {
            spec.to_command()?;
        }

        match (&self.readiness.http, &self.readiness.command) {
            (Some(http), None) => {
                reqwest::Url::parse(&http.url)
                    .with_context(|| format!("Invalid readiness URL: {}", http.url))?;
            }
            (None, Some(command)) => {
                command.to_command()?;
            }
            (Some(_), Some(_)) => {
                anyhow::bail!("readiness must declare either 'http' or 'command', not both")
            }
            (None, None) => anyhow::bail!("readiness must declare 'http' or 'command'"),
        }

        Ok(())
    }
}
