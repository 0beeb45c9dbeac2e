//! Main execution engine - sequences the stages of a pipeline run

use crate::{
    core::{
        CommandRecord, ExecutionStatus, Pipeline, PipelineContext, PipelineError, RunCondition,
        StageName, StageState,
    },
    execution::{
        ReadinessCheck, ReadinessProber, ResultReporter, ServiceHandle, StageExecutor,
        SystemReadinessCheck,
    },
    process::CommandExecutor,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: Uuid,
        pipeline_name: String,
    },
    ServicesStarting {
        count: usize,
    },
    ServiceWaiting {
        service: String,
        probe: String,
        timeout: Duration,
    },
    ServiceReady {
        service: String,
        attempts: usize,
        elapsed: Duration,
    },
    ServiceUnavailable {
        service: String,
        error: String,
    },
    StageStarted {
        stage: StageName,
        commands: usize,
    },
    CommandStarted {
        stage: StageName,
        command: String,
    },
    CommandFinished {
        stage: StageName,
        command: String,
        record: CommandRecord,
    },
    CommandFailed {
        stage: StageName,
        command: String,
        error: String,
        record: Option<CommandRecord>,
    },
    StageCompleted {
        stage: StageName,
    },
    StageFailed {
        stage: StageName,
        error: String,
        best_effort: bool,
    },
    StageSkipped {
        stage: StageName,
        reason: String,
    },
    ReportSubmitted,
    ReportFailed {
        error: String,
    },
    ServiceTeardownFailed {
        service: String,
        error: String,
    },
    PipelineCompleted {
        execution_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Main pipeline execution engine
///
/// Runs stages strictly one after another. Services are started before the
/// first stage, probed right before the script stage and torn down after
/// the last stage, whatever happened in between.
pub struct ExecutionEngine<E> {
    executor: Arc<E>,
    prober: ReadinessProber,
    reporter: Option<ResultReporter>,
    event_handlers: Vec<EventHandler>,
}

impl<E: CommandExecutor + 'static> ExecutionEngine<E> {
    pub fn new(executor: E, readiness: Arc<dyn ReadinessCheck>) -> Self {
        Self {
            executor: Arc::new(executor),
            prober: ReadinessProber::new(readiness),
            reporter: None,
            event_handlers: Vec::new(),
        }
    }

    /// Engine probing services over real HTTP and subprocesses
    pub fn system(executor: E) -> anyhow::Result<Self> {
        let executor = Arc::new(executor);
        let readiness = SystemReadinessCheck::new(executor.clone())?;
        Ok(Self {
            executor,
            prober: ReadinessProber::new(Arc::new(readiness)),
            reporter: None,
            event_handlers: Vec::new(),
        })
    }

    pub fn with_reporter(mut self, reporter: ResultReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Execute the entire pipeline
    ///
    /// Returns the first fatal error. Failures in best-effort stages,
    /// reporting and teardown end up in `pipeline.state.warnings` instead.
    pub async fn execute(&self, pipeline: &mut Pipeline) -> Result<(), PipelineError> {
        let execution_id = pipeline.state.execution_id;
        let pipeline_name = pipeline.name.clone();

        info!("Starting pipeline execution: {} ({})", pipeline_name, execution_id);
        self.emit_event(ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name: pipeline_name.clone(),
        });

        pipeline.state.start(pipeline.stages.len());

        let runner =
            StageExecutor::new(self.executor.clone()).with_timeout(pipeline.command_timeout);
        let service_context = pipeline.create_context();
        let mut services = ServiceHandle::new(pipeline.services.clone());

        let mut fatal: Option<PipelineError> = None;

        if !services.is_empty() {
            self.emit_event(ExecutionEvent::ServicesStarting {
                count: services.services().len(),
            });
            if let Err(e) = services.start(&runner, &service_context).await {
                error!("Failed to start services: {}", e);
                fatal = Some(e);
            }
        }

        for index in 0..pipeline.stages.len() {
            let name = pipeline.stages[index].name;

            let skip_reason = match (name.run_condition(), &fatal) {
                (RunCondition::Healthy, Some(e)) => Some(format!("pipeline failed: {}", e)),
                (RunCondition::OnFailure, None) => Some("pipeline succeeded".to_string()),
                _ => None,
            };
            if let Some(reason) = skip_reason {
                self.skip_stage(pipeline, index, reason);
                continue;
            }

            if name.requires_services() {
                if let Err(e) = self.await_services(&services, &service_context).await {
                    self.skip_stage(pipeline, index, format!("services unavailable: {}", e));
                    fatal = Some(e);
                    continue;
                }
            }

            if let Err(e) = self.run_stage(pipeline, index, &runner).await {
                fatal = Some(e);
                continue;
            }

            if name == StageName::Script {
                self.report(pipeline).await;
            }
        }

        for (service, e) in services.teardown(&runner, &service_context).await {
            pipeline
                .state
                .warn(format!("teardown of service {} failed: {}", service, e));
            self.emit_event(ExecutionEvent::ServiceTeardownFailed {
                service,
                error: e.to_string(),
            });
        }

        pipeline.update_counts();
        let status = if fatal.is_some() {
            pipeline.state.fail();
            ExecutionStatus::Failed
        } else {
            pipeline.state.complete();
            ExecutionStatus::Completed
        };

        info!("Pipeline execution finished: {} - {:?}", pipeline_name, status);
        self.emit_event(ExecutionEvent::PipelineCompleted {
            execution_id,
            status,
        });

        match fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Block until every declared service passes its readiness check
    async fn await_services(
        &self,
        services: &ServiceHandle,
        context: &PipelineContext,
    ) -> Result<(), PipelineError> {
        for service in services.services() {
            self.emit_event(ExecutionEvent::ServiceWaiting {
                service: service.name.clone(),
                probe: service.readiness.describe(),
                timeout: service.timeout,
            });

            match self.prober.wait_ready(service, context).await {
                Ok(report) => self.emit_event(ExecutionEvent::ServiceReady {
                    service: service.name.clone(),
                    attempts: report.attempts,
                    elapsed: report.elapsed,
                }),
                Err(e) => {
                    self.emit_event(ExecutionEvent::ServiceUnavailable {
                        service: service.name.clone(),
                        error: e.to_string(),
                    });
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Run every command of a stage
    ///
    /// A failing command stops a regular stage at once. Best-effort stages
    /// run all their commands and never return an error.
    async fn run_stage(
        &self,
        pipeline: &mut Pipeline,
        index: usize,
        runner: &StageExecutor<E>,
    ) -> Result<(), PipelineError> {
        let name = pipeline.stages[index].name;
        let context = pipeline.create_context_for_stage(name);
        let started_at = chrono::Utc::now();

        let stage = &mut pipeline.stages[index];
        let continue_on_failure = stage.continue_on_failure;
        stage.state = StageState::Running { started_at };

        info!("Running stage {} ({} commands)", name, stage.commands.len());
        self.emit_event(ExecutionEvent::StageStarted {
            stage: name,
            commands: stage.commands.len(),
        });

        let mut first_error: Option<PipelineError> = None;

        for command in stage.commands.iter_mut() {
            self.emit_event(ExecutionEvent::CommandStarted {
                stage: name,
                command: command.line.clone(),
            });

            match runner.execute(command, &context).await {
                Ok(()) => {
                    if let Some(record) = command.result.clone() {
                        self.emit_event(ExecutionEvent::CommandFinished {
                            stage: name,
                            command: command.line.clone(),
                            record,
                        });
                    }
                }
                Err(e) => {
                    self.emit_event(ExecutionEvent::CommandFailed {
                        stage: name,
                        command: command.line.clone(),
                        error: e.to_string(),
                        record: command.result.clone(),
                    });
                    first_error.get_or_insert(e);
                    if !continue_on_failure {
                        break;
                    }
                }
            }
        }

        let Some(e) = first_error else {
            stage.state = StageState::Completed {
                started_at,
                completed_at: chrono::Utc::now(),
            };
            self.emit_event(ExecutionEvent::StageCompleted { stage: name });
            return Ok(());
        };

        stage.state = StageState::Failed {
            error: e.to_string(),
            started_at,
            failed_at: chrono::Utc::now(),
        };
        self.emit_event(ExecutionEvent::StageFailed {
            stage: name,
            error: e.to_string(),
            best_effort: continue_on_failure,
        });

        if continue_on_failure {
            warn!("Best-effort stage {} failed: {}", name, e);
            pipeline.state.warn(format!("stage {} failed: {}", name, e));
            Ok(())
        } else {
            error!("Stage {} failed: {}", name, e);
            Err(e)
        }
    }

    fn skip_stage(&self, pipeline: &mut Pipeline, index: usize, reason: String) {
        let stage = &mut pipeline.stages[index];
        info!("Skipping stage {}: {}", stage.name, reason);
        stage.state = StageState::Skipped {
            reason: reason.clone(),
        };
        self.emit_event(ExecutionEvent::StageSkipped {
            stage: stage.name,
            reason,
        });
    }

    /// Upload coverage; failures only ever become warnings
    async fn report(&self, pipeline: &mut Pipeline) {
        let Some(reporter) = &self.reporter else {
            return;
        };

        let context = pipeline.create_context();
        match reporter.report(pipeline, &context).await {
            Ok(()) => self.emit_event(ExecutionEvent::ReportSubmitted),
            Err(e) => {
                pipeline.state.warn(e.to_string());
                self.emit_event(ExecutionEvent::ReportFailed {
                    error: e.to_string(),
                });
            }
        }
    }
}
