//! stagerun - a staged build runner with external service dependencies

pub mod cli;
pub mod core;
pub mod execution;
pub mod process;

// Re-export commonly used types
pub use crate::core::{
    Command, CommandRecord, ExecutionStatus, Pipeline, PipelineContext, PipelineError,
    ReadinessProbe, ServiceDependency, Stage, StageName, StageState,
};
pub use crate::execution::{
    ExecutionEngine, ExecutionEvent, ReadinessCheck, ReadinessProber, ResultReporter,
    ServiceHandle, StageExecutor,
};
pub use crate::process::{CommandExecutor, ExecutorConfig, ProcessExecutor};
