//! Scoped ownership of background services

use crate::{
    core::{PipelineContext, PipelineError, ServiceDependency},
    execution::StageExecutor,
    process::CommandExecutor,
};
use tracing::{info, warn};

/// Handle to the background services of one pipeline run
///
/// Acquired before the first stage and released after the last one.
/// `teardown` must be awaited on every path; a handle dropped while
/// services may still be running logs a warning.
#[derive(Debug)]
pub struct ServiceHandle {
    services: Vec<ServiceDependency>,
    /// Number of services whose start was attempted
    attempted: usize,
    torn_down: bool,
}

impl ServiceHandle {
    pub fn new(services: Vec<ServiceDependency>) -> Self {
        Self {
            services,
            attempted: 0,
            torn_down: false,
        }
    }

    pub fn services(&self) -> &[ServiceDependency] {
        &self.services
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Run start commands in declaration order, stopping at the first failure
    pub async fn start<E: CommandExecutor>(
        &mut self,
        runner: &StageExecutor<E>,
        context: &PipelineContext,
    ) -> Result<(), PipelineError> {
        for service in self.services.iter_mut() {
            self.attempted += 1;
            if let Some(start) = service.start.as_mut() {
                info!("Starting service {}", service.name);
                runner.execute(start, context).await?;
            }
        }
        Ok(())
    }

    /// Run stop commands in reverse order; failures are collected, never raised
    pub async fn teardown<E: CommandExecutor>(
        &mut self,
        runner: &StageExecutor<E>,
        context: &PipelineContext,
    ) -> Vec<(String, PipelineError)> {
        let mut failures = Vec::new();
        if self.torn_down {
            return failures;
        }
        self.torn_down = true;

        for service in self.services[..self.attempted].iter_mut().rev() {
            if let Some(stop) = service.stop.as_mut() {
                info!("Stopping service {}", service.name);
                if let Err(e) = runner.execute(stop, context).await {
                    warn!("Teardown of service {} failed: {}", service.name, e);
                    failures.push((service.name.clone(), e));
                }
            }
        }

        failures
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        if !self.torn_down && self.attempted > 0 {
            warn!(
                "Service handle dropped without teardown; {} service(s) may still be running",
                self.attempted
            );
        }
    }
}
