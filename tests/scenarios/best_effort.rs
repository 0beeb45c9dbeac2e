//! Test: Best-Effort Stages - failures never change the outcome

use crate::helpers::*;
use stagerun::core::{ExecutionStatus, StageName};
use stagerun::execution::ExecutionEvent;
use std::sync::Arc;

#[tokio::test]
async fn test_after_success_failure_keeps_pipeline_green() {
    let yaml = r#"
name: "Test: After Success Failure"
script: [ "pytest" ]
after_success:
  - coveralls
  - docker-compose down
"#;

    let executor = MockExecutor::failing(&[("coveralls", 1)]);
    let result = run_pipeline_with_mock(
        pipeline_from_yaml(yaml),
        executor.clone(),
        Arc::new(ReadyAfter::new(0)),
        None,
    )
    .await;

    assert!(result.is_success());
    assert_eq!(result.pipeline.state.status.exit_code(), 0);
    assert_stage_failed(&result, StageName::AfterSuccess, "coveralls");

    // the failing command does not stop the rest of the stage
    assert!(executor.was_called("docker-compose down"));

    assert_eq!(result.pipeline.state.warnings.len(), 1);
    assert!(result.pipeline.state.warnings[0].contains("after_success"));

    assert!(result.events.iter().any(|event| matches!(
        event,
        ExecutionEvent::StageFailed {
            stage: StageName::AfterSuccess,
            best_effort: true,
            ..
        }
    )));
}

#[tokio::test]
async fn test_after_failure_failure_keeps_original_error() {
    let yaml = r#"
name: "Test: After Failure Failure"
script: [ "pytest" ]
after_failure: [ "upload-logs" ]
"#;

    let executor = MockExecutor::failing(&[("pytest", 1), ("upload-logs", 7)]);
    let result = run_pipeline_with_mock(
        pipeline_from_yaml(yaml),
        executor,
        Arc::new(ReadyAfter::new(0)),
        None,
    )
    .await;

    assert_eq!(result.pipeline.state.status, ExecutionStatus::Failed);
    assert_eq!(result.result.as_ref().unwrap_err().exit_code(), Some(1));
    assert_stage_failed(&result, StageName::AfterFailure, "with code 7");
}
