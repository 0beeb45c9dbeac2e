//! Test: Service Readiness - the script waits for every declared service

use crate::helpers::*;
use stagerun::core::{PipelineError, StageName};
use stagerun::execution::ExecutionEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const NEO4J_PIPELINE: &str = r#"
name: "Test: Neo4j"
services:
  - name: neo4j
    start: docker-compose up -d
    stop: docker-compose down
    readiness:
      http: { url: "http://localhost:7474" }
    timeout_secs: 5
    interval_secs: 1
install: [ "pip install ." ]
script: [ "coverage run setup.py test" ]
after_success: [ "coveralls" ]
"#;

/// The probe keeps answering 503 past the timeout: the script never runs
#[tokio::test(start_paused = true)]
async fn test_service_never_ready() {
    let executor = MockExecutor::new();
    let readiness = Arc::new(ReadyAfter::never());

    let started = Instant::now();
    let result = run_pipeline_with_mock(
        pipeline_from_yaml(NEO4J_PIPELINE),
        executor.clone(),
        readiness.clone(),
        None,
    )
    .await;

    assert!(started.elapsed() >= Duration::from_secs(5));
    assert!(result.is_failed());
    match &result.result {
        Err(PipelineError::ServiceUnavailable {
            service,
            timeout,
            last_error,
            ..
        }) => {
            assert_eq!(service, "neo4j");
            assert_eq!(*timeout, Duration::from_secs(5));
            assert!(last_error.contains("503"));
        }
        other => panic!("expected ServiceUnavailable, got {:?}", other),
    }

    assert_stage_completed(&result, StageName::Install);
    assert_stage_skipped(&result, StageName::Script);
    assert!(!executor.was_called("coverage run setup.py test"));
    assert!(readiness.calls() >= 5);

    // best-effort stages and teardown still run
    assert!(executor.was_called("coveralls"));
    assert_eq!(executor.calls().last().map(String::as_str), Some("docker-compose down"));
}

/// Script starts only after the service became ready
#[tokio::test(start_paused = true)]
async fn test_script_waits_for_readiness() {
    let executor = MockExecutor::new();
    let result = run_pipeline_with_mock(
        pipeline_from_yaml(NEO4J_PIPELINE),
        executor.clone(),
        Arc::new(ReadyAfter::new(2)),
        None,
    )
    .await;

    assert!(result.is_success());
    assert_eq!(
        executor.calls(),
        vec![
            "docker-compose up -d",
            "pip install .",
            "coverage run setup.py test",
            "coveralls",
            "docker-compose down",
        ]
    );

    let ready = result
        .events
        .iter()
        .position(|e| matches!(e, ExecutionEvent::ServiceReady { attempts: 3, .. }))
        .expect("service should become ready on the third attempt");
    let script = result
        .events
        .iter()
        .position(|e| {
            matches!(
                e,
                ExecutionEvent::StageStarted {
                    stage: StageName::Script,
                    ..
                }
            )
        })
        .expect("script should start");
    assert!(ready < script);
}

/// Readiness is not probed when the install stage already failed
#[tokio::test]
async fn test_no_probe_after_install_failure() {
    let executor = MockExecutor::failing(&[("pip install .", 1)]);
    let readiness = Arc::new(ReadyAfter::new(0));
    let result = run_pipeline_with_mock(
        pipeline_from_yaml(NEO4J_PIPELINE),
        executor.clone(),
        readiness.clone(),
        None,
    )
    .await;

    assert!(result.is_failed());
    assert_eq!(readiness.calls(), 0);
    assert!(executor.was_called("docker-compose down"));
}

/// A failing start command is fatal, but teardown still runs
#[tokio::test]
async fn test_start_failure_is_fatal() {
    let executor = MockExecutor::failing(&[("docker-compose up -d", 1)]);
    let result = run_pipeline_with_mock(
        pipeline_from_yaml(NEO4J_PIPELINE),
        executor.clone(),
        Arc::new(ReadyAfter::new(0)),
        None,
    )
    .await;

    assert!(result.is_failed());
    assert_stage_skipped(&result, StageName::Install);
    assert_stage_skipped(&result, StageName::Script);
    assert!(executor.was_called("coveralls"));
    assert!(executor.was_called("docker-compose down"));
}

/// A failing stop command only produces a warning
#[tokio::test]
async fn test_teardown_failure_is_not_fatal() {
    let executor = MockExecutor::failing(&[("docker-compose down", 1)]);
    let result = run_pipeline_with_mock(
        pipeline_from_yaml(NEO4J_PIPELINE),
        executor,
        Arc::new(ReadyAfter::new(0)),
        None,
    )
    .await;

    assert!(result.is_success());
    assert_eq!(result.pipeline.state.warnings.len(), 1);
    assert!(result.pipeline.state.warnings[0].contains("neo4j"));
    assert!(result
        .events
        .iter()
        .any(|e| matches!(e, ExecutionEvent::ServiceTeardownFailed { service, .. } if service == "neo4j")));
}

/// Teardown is the last thing that happens, after a failed script too
#[tokio::test]
async fn test_teardown_after_script_failure() {
    let executor = MockExecutor::failing(&[("coverage run setup.py test", 1)]);
    let result = run_pipeline_with_mock(
        pipeline_from_yaml(NEO4J_PIPELINE),
        executor.clone(),
        Arc::new(ReadyAfter::new(0)),
        None,
    )
    .await;

    assert!(result.is_failed());
    assert_eq!(
        executor.calls(),
        vec![
            "docker-compose up -d",
            "pip install .",
            "coverage run setup.py test",
            "coveralls",
            "docker-compose down",
        ]
    );
}
