//! Stage domain model

use crate::core::{command::Command, state::StageState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Names of the stages a pipeline can declare, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    BeforeInstall,
    Install,
    Script,
    AfterSuccess,
    AfterFailure,
}

/// When a stage is allowed to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunCondition {
    /// Only while no fatal error has happened
    Healthy,
    /// Always, as part of the deferred block
    Always,
    /// Only once the pipeline has failed
    OnFailure,
}

impl StageName {
    /// All stages in execution order
    pub const ALL: [StageName; 5] = [
        StageName::BeforeInstall,
        StageName::Install,
        StageName::Script,
        StageName::AfterSuccess,
        StageName::AfterFailure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::BeforeInstall => "before_install",
            StageName::Install => "install",
            StageName::Script => "script",
            StageName::AfterSuccess => "after_success",
            StageName::AfterFailure => "after_failure",
        }
    }

    /// Failures in best-effort stages are logged but never fail the pipeline
    pub fn is_best_effort(&self) -> bool {
        matches!(self, StageName::AfterSuccess | StageName::AfterFailure)
    }

    /// Whether all declared services must be ready before this stage starts
    pub fn requires_services(&self) -> bool {
        matches!(self, StageName::Script)
    }

    pub fn run_condition(&self) -> RunCondition {
        match self {
            StageName::BeforeInstall | StageName::Install | StageName::Script => {
                RunCondition::Healthy
            }
            StageName::AfterSuccess => RunCondition::Always,
            StageName::AfterFailure => RunCondition::OnFailure,
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, ordered group of commands executed as a unit
#[derive(Debug, Clone)]
pub struct Stage {
    pub name: StageName,

    pub commands: Vec<Command>,

    /// Keep going (and keep the pipeline green) when a command fails
    pub continue_on_failure: bool,

    /// Runtime state
    pub state: StageState,
}

impl Stage {
    pub fn new(name: StageName, commands: Vec<Command>) -> Self {
        Self {
            name,
            commands,
            continue_on_failure: name.is_best_effort(),
            state: StageState::Pending,
        }
    }

    /// Commands that have finished, in order
    pub fn executed_commands(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter().filter(|c| c.result.is_some())
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, StageState::Completed { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, StageState::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.state, StageState::Skipped { .. })
    }
}
