//! Test: Reporting - coverage upload after a successful script

use crate::helpers::*;
use async_trait::async_trait;
use stagerun::core::config::CoverageConfig;
use stagerun::core::{ExecutionStatus, PipelineError};
use stagerun::execution::{CoverageReport, ExecutionEvent, ReportSink, ResultReporter};
use std::sync::{Arc, Mutex};

/// Records reports, or rejects them all
#[derive(Default)]
struct RecordingSink {
    reject: bool,
    reports: Mutex<Vec<CoverageReport>>,
}

#[async_trait]
impl ReportSink for RecordingSink {
    async fn submit(&self, report: &CoverageReport) -> Result<(), PipelineError> {
        if self.reject {
            return Err(PipelineError::Reporting("HTTP 500 from endpoint".to_string()));
        }
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

const PIPELINE: &str = r#"
name: "Test: Reporting"
script: [ "coverage run setup.py test" ]
"#;

fn reporter(dir: &tempfile::TempDir, sink: Arc<RecordingSink>) -> ResultReporter {
    let config = CoverageConfig {
        artifact: "coverage.json".to_string(),
        endpoint: "https://coveralls.example/api/v1/jobs".to_string(),
        token_env: None,
    };
    ResultReporter::new(config, sink).with_base_dir(dir.path())
}

#[tokio::test]
async fn test_report_submitted_after_script() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("coverage.json"), r#"{"covered": 120, "total": 150}"#).unwrap();
    let sink = Arc::new(RecordingSink::default());

    let result = run_pipeline_with_mock(
        pipeline_from_yaml(PIPELINE),
        MockExecutor::new(),
        Arc::new(ReadyAfter::new(0)),
        Some(reporter(&dir, sink.clone())),
    )
    .await;

    assert!(result.is_success());
    assert!(result.events.iter().any(|e| matches!(e, ExecutionEvent::ReportSubmitted)));

    let reports = sink.reports.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].pipeline, "Test: Reporting");
    assert_eq!(reports[0].coverage["covered"], 120);
    assert_eq!(reports[0].stages[0].status, "completed");
    assert_eq!(reports[0].stages[0].commands_run, 1);
}

/// Upload failure becomes a warning; the build stays green
#[tokio::test]
async fn test_report_failure_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("coverage.json"), "{}").unwrap();
    let sink = Arc::new(RecordingSink {
        reject: true,
        ..Default::default()
    });

    let result = run_pipeline_with_mock(
        pipeline_from_yaml(PIPELINE),
        MockExecutor::new(),
        Arc::new(ReadyAfter::new(0)),
        Some(reporter(&dir, sink)),
    )
    .await;

    assert!(result.is_success());
    assert_eq!(result.pipeline.state.status, ExecutionStatus::Completed);
    assert_eq!(result.pipeline.state.warnings.len(), 1);
    assert!(result.pipeline.state.warnings[0].contains("HTTP 500"));
    assert!(result
        .events
        .iter()
        .any(|e| matches!(e, ExecutionEvent::ReportFailed { .. })));
}

/// A missing artifact is also only a warning
#[tokio::test]
async fn test_missing_artifact_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());

    let result = run_pipeline_with_mock(
        pipeline_from_yaml(PIPELINE),
        MockExecutor::new(),
        Arc::new(ReadyAfter::new(0)),
        Some(reporter(&dir, sink.clone())),
    )
    .await;

    assert!(result.is_success());
    assert!(result.pipeline.state.warnings[0].contains("coverage.json"));
    assert!(sink.reports.lock().unwrap().is_empty());
}

/// No report when the script stage failed
#[tokio::test]
async fn test_no_report_after_failed_script() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("coverage.json"), "{}").unwrap();
    let sink = Arc::new(RecordingSink::default());

    let result = run_pipeline_with_mock(
        pipeline_from_yaml(PIPELINE),
        MockExecutor::failing(&[("coverage run setup.py test", 1)]),
        Arc::new(ReadyAfter::new(0)),
        Some(reporter(&dir, sink.clone())),
    )
    .await;

    assert!(result.is_failed());
    assert!(sink.reports.lock().unwrap().is_empty());
    assert!(result.pipeline.state.warnings.is_empty());
}
