//! Service readiness prober - polls a service until it is usable

use crate::{
    core::config::ProbeMethod,
    core::{PipelineContext, PipelineError, ReadinessProbe, ServiceDependency},
    execution::http::create_probe_client,
    process::CommandExecutor,
};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

/// Stand-in deadline for timeouts too large to add to an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// A single readiness check
#[async_trait]
pub trait ReadinessCheck: Send + Sync {
    /// Probe the service once; `Err` carries a human readable reason
    async fn check(
        &self,
        service: &ServiceDependency,
        context: &PipelineContext,
    ) -> Result<(), String>;
}

/// Readiness check backed by real HTTP requests and subprocesses
pub struct SystemReadinessCheck<E> {
    http: reqwest::Client,
    executor: Arc<E>,
}

impl<E: CommandExecutor> SystemReadinessCheck<E> {
    pub fn new(executor: Arc<E>) -> Result<Self> {
        Ok(Self {
            http: create_probe_client()?,
            executor,
        })
    }

    async fn check_http(&self, url: &str, method: ProbeMethod) -> Result<(), String> {
        let request = match method {
            ProbeMethod::Head => self.http.head(url),
            ProbeMethod::Get => self.http.get(url),
        };

        let response = request
            .send()
            .await
            .map_err(|e| format!("{} {} failed: {}", method.as_str(), url, e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ))
        }
    }
}

#[async_trait]
impl<E: CommandExecutor> ReadinessCheck for SystemReadinessCheck<E> {
    async fn check(
        &self,
        service: &ServiceDependency,
        context: &PipelineContext,
    ) -> Result<(), String> {
        match &service.readiness {
            ReadinessProbe::Http { url, method } => {
                self.check_http(&context.expand(url), *method).await
            }
            ReadinessProbe::Command(command) => {
                let argv = command.render(context);
                let record = self
                    .executor
                    .run(&argv, &context.command_env(), None)
                    .await
                    .map_err(|e| e.to_string())?;
                if record.success() {
                    Ok(())
                } else {
                    Err(format!("`{}` exited with code {}", command.line, record.exit_code))
                }
            }
        }
    }
}

/// Outcome of a successful wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReport {
    pub attempts: usize,
    pub elapsed: Duration,
}

/// Polls readiness checks until success or timeout
#[derive(Clone)]
pub struct ReadinessProber {
    check: Arc<dyn ReadinessCheck>,
}

impl ReadinessProber {
    pub fn new(check: Arc<dyn ReadinessCheck>) -> Self {
        Self { check }
    }

    /// Block until the service is ready
    ///
    /// The check is invoked every `service.interval`; each attempt is bounded
    /// by the time left before `service.timeout`. Fails with
    /// [`PipelineError::ServiceUnavailable`] once the budget is spent.
    pub async fn wait_ready(
        &self,
        service: &ServiceDependency,
        context: &PipelineContext,
    ) -> Result<ProbeReport, PipelineError> {
        let started = Instant::now();
        let deadline = started
            .checked_add(service.timeout)
            .unwrap_or_else(|| started + FAR_FUTURE);
        let mut attempts = 0;

        info!(
            "Waiting for service {} ({}), timeout {}s",
            service.name,
            service.readiness.describe(),
            service.timeout.as_secs()
        );

        loop {
            attempts += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());

            let last_error = match timeout(remaining, self.check.check(service, context)).await {
                Ok(Ok(())) => {
                    let elapsed = started.elapsed();
                    info!(
                        "Service {} ready after {} attempt(s) in {:?}",
                        service.name, attempts, elapsed
                    );
                    return Ok(ProbeReport { attempts, elapsed });
                }
                Ok(Err(reason)) => reason,
                Err(_) => "readiness check timed out".to_string(),
            };

            debug!(
                "Service {} not ready (attempt {}): {}",
                service.name, attempts, last_error
            );

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    "Service {} unavailable after {} attempts: {}",
                    service.name, attempts, last_error
                );
                return Err(PipelineError::ServiceUnavailable {
                    service: service.name.clone(),
                    timeout: service.timeout,
                    attempts,
                    last_error,
                });
            }

            sleep(service.interval.min(deadline - now)).await;
        }
    }
}
