//! Pipeline domain model

use crate::core::{
    config::PipelineConfig,
    context::PipelineContext,
    service::ServiceDependency,
    stage::{Stage, StageName},
    state::{ExecutionStatus, PipelineState},
};
use anyhow::Result;
use std::collections::HashMap;
use std::time::Duration;

/// A pipeline definition
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Environment injected into every command
    pub env: HashMap<String, String>,

    /// Stages in execution order (only the declared ones)
    pub stages: Vec<Stage>,

    /// Services that must be ready before the script stage
    pub services: Vec<ServiceDependency>,

    /// Per-command timeout
    pub command_timeout: Option<Duration>,

    /// Execution state
    pub state: PipelineState,
}

impl Pipeline {
    /// Create a pipeline from configuration
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let mut stages = Vec::new();
        for name in StageName::ALL {
            let specs = config.stage_commands(name);
            if specs.is_empty() {
                continue;
            }
            let commands = specs
                .iter()
                .map(|spec| spec.to_command())
                .collect::<Result<Vec<_>>>()?;
            stages.push(Stage::new(name, commands));
        }

        let services = config
            .services
            .iter()
            .map(ServiceDependency::from_config)
            .collect::<Result<Vec<_>>>()?;

        Ok(Pipeline {
            name: config.name.clone(),
            env: config.get_env()?,
            stages,
            services,
            command_timeout: config.command_timeout_secs.map(Duration::from_secs),
            state: PipelineState::new(),
        })
    }

    /// Build a pipeline directly from stages
    pub fn new(name: impl Into<String>, mut stages: Vec<Stage>) -> Self {
        stages.sort_by_key(|s| s.name);
        Pipeline {
            name: name.into(),
            env: HashMap::new(),
            stages,
            services: Vec::new(),
            command_timeout: None,
            state: PipelineState::new(),
        }
    }

    /// Get a stage by name
    pub fn stage(&self, name: StageName) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Names of the declared stages, in execution order
    pub fn stage_names(&self) -> Vec<StageName> {
        self.stages.iter().map(|s| s.name).collect()
    }

    /// Check if pipeline has failed
    pub fn has_failed(&self) -> bool {
        self.state.status == ExecutionStatus::Failed
    }

    /// Check if every stage reached a terminal state
    pub fn is_complete(&self) -> bool {
        self.stages.iter().all(|s| s.state.is_terminal())
    }

    /// Create the execution context shared by services and stages
    pub fn create_context(&self) -> PipelineContext {
        let mut context = PipelineContext::new();
        context.env.extend(self.env.clone());
        context.set_var(
            "STAGERUN_EXECUTION_ID",
            self.state.execution_id.to_string(),
        );
        context
    }

    /// Create execution context for a stage
    pub fn create_context_for_stage(&self, name: StageName) -> PipelineContext {
        let mut context = self.create_context();
        context.current_stage = Some(name.to_string());
        context
    }

    /// Context that only sees the pipeline env, for rendering commands
    /// without running them
    pub fn create_isolated_context(&self, stage: Option<StageName>) -> PipelineContext {
        let mut context = PipelineContext::isolated(self.env.clone());
        context.current_stage = stage.map(|name| name.to_string());
        context
    }

    /// Recount stage outcomes into the pipeline state
    pub fn update_counts(&mut self) {
        self.state.completed_stages = self.stages.iter().filter(|s| s.is_completed()).count();
        self.state.failed_stages = self.stages.iter().filter(|s| s.is_failed()).count();
    }
}
