//! Pipeline context - environment shared by every command

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
            .expect("variable pattern is a valid regex")
    })
}

/// Execution context for a pipeline run
///
/// Holds the environment injected into each command and used to expand
/// `$VAR` / `${VAR}` references in command arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineContext {
    /// Pipeline and user-defined environment
    pub env: HashMap<String, String>,

    /// Stage currently executing (if any)
    pub current_stage: Option<String>,

    /// Whether lookups fall back to the process environment
    pub inherit_process_env: bool,
}

impl PipelineContext {
    /// Create a new empty context that falls back to the process environment
    pub fn new() -> Self {
        Self {
            env: HashMap::new(),
            current_stage: None,
            inherit_process_env: true,
        }
    }

    /// Create a context that only sees the given variables
    pub fn isolated(env: HashMap<String, String>) -> Self {
        Self {
            env,
            current_stage: None,
            inherit_process_env: false,
        }
    }

    pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env.insert(key.into(), value.into());
    }

    /// Look up a variable, pipeline env first
    pub fn lookup(&self, key: &str) -> Option<String> {
        if let Some(value) = self.env.get(key) {
            return Some(value.clone());
        }
        if self.inherit_process_env {
            std::env::var(key).ok()
        } else {
            None
        }
    }

    /// Expand `$VAR` and `${VAR}` references; unknown variables expand to ""
    pub fn expand(&self, text: &str) -> String {
        variable_pattern()
            .replace_all(text, |caps: &Captures| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                self.lookup(name).unwrap_or_default()
            })
            .into_owned()
    }

    /// Variables exported to a command's subprocess
    pub fn command_env(&self) -> HashMap<String, String> {
        let mut vars = self.env.clone();
        vars.insert("CI".to_string(), "true".to_string());
        vars.insert("STAGERUN".to_string(), "true".to_string());
        if let Some(ref stage) = self.current_stage {
            vars.insert("STAGERUN_STAGE".to_string(), stage.clone());
        }
        vars
    }
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new()
    }
}
