//! Result reporter - uploads the coverage artifact after the script stage

use crate::{
    core::{config::CoverageConfig, Pipeline, PipelineContext, PipelineError, StageState},
    execution::http::create_upload_client,
};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of one stage, as sent to the reporting service
#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub name: String,
    pub status: String,
    pub commands_run: usize,
}

/// Payload sent to the reporting endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CoverageReport {
    pub service_name: String,
    pub pipeline: String,
    pub execution_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_token: Option<String>,
    pub artifact: String,
    /// Artifact content: parsed when it is JSON, raw text otherwise
    pub coverage: serde_json::Value,
    pub stages: Vec<StageSummary>,
}

/// Destination for coverage reports
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn submit(&self, report: &CoverageReport) -> Result<(), PipelineError>;
}

/// Posts reports as JSON to an HTTP endpoint
pub struct HttpReportSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpReportSink {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: create_upload_client()?,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ReportSink for HttpReportSink {
    async fn submit(&self, report: &CoverageReport) -> Result<(), PipelineError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(report)
            .send()
            .await
            .map_err(|e| PipelineError::Reporting(format!("upload to {} failed: {}", self.endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Reporting(format!(
                "{} answered HTTP {}: {}",
                self.endpoint,
                status.as_u16(),
                body.trim()
            )));
        }

        debug!("Coverage upload accepted with HTTP {}", status.as_u16());
        Ok(())
    }
}

/// Collects the coverage artifact and forwards it to a [`ReportSink`]
pub struct ResultReporter {
    config: CoverageConfig,
    sink: Arc<dyn ReportSink>,
    base_dir: Option<PathBuf>,
}

impl ResultReporter {
    pub fn new(config: CoverageConfig, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            config,
            sink,
            base_dir: None,
        }
    }

    /// Reporter posting to the configured endpoint
    pub fn from_config(config: &CoverageConfig) -> Result<Self> {
        let sink = HttpReportSink::new(config.endpoint.clone())?;
        Ok(Self::new(config.clone(), Arc::new(sink)))
    }

    /// Resolve the artifact path relative to this directory
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    fn artifact_path(&self) -> PathBuf {
        match &self.base_dir {
            Some(dir) => dir.join(&self.config.artifact),
            None => PathBuf::from(&self.config.artifact),
        }
    }

    /// Build the report for a finished script stage
    pub async fn collect(
        &self,
        pipeline: &Pipeline,
        context: &PipelineContext,
    ) -> Result<CoverageReport, PipelineError> {
        let path = self.artifact_path();
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            PipelineError::Reporting(format!(
                "cannot read coverage artifact {}: {}",
                path.display(),
                e
            ))
        })?;

        let coverage = serde_json::from_str(&content)
            .unwrap_or(serde_json::Value::String(content));

        let repo_token = self
            .config
            .token_env
            .as_deref()
            .and_then(|name| context.lookup(name));

        let stages = pipeline
            .stages
            .iter()
            .map(|stage| StageSummary {
                name: stage.name.to_string(),
                status: match stage.state {
                    StageState::Pending => "pending",
                    StageState::Running { .. } => "running",
                    StageState::Completed { .. } => "completed",
                    StageState::Failed { .. } => "failed",
                    StageState::Skipped { .. } => "skipped",
                }
                .to_string(),
                commands_run: stage.executed_commands().count(),
            })
            .collect();

        Ok(CoverageReport {
            service_name: "stagerun".to_string(),
            pipeline: pipeline.name.clone(),
            execution_id: pipeline.state.execution_id,
            repo_token,
            artifact: self.config.artifact.clone(),
            coverage,
            stages,
        })
    }

    /// Collect and submit; the caller decides what a failure means
    pub async fn report(
        &self,
        pipeline: &Pipeline,
        context: &PipelineContext,
    ) -> Result<(), PipelineError> {
        let result = async {
            let report = self.collect(pipeline, context).await?;
            self.sink.submit(&report).await
        }
        .await;

        match &result {
            Ok(()) => info!("Coverage report submitted to {}", self.config.endpoint),
            Err(e) => warn!("Coverage report not submitted: {}", e),
        }
        result
    }
}
