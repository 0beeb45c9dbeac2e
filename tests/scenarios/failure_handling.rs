//! Test: Failure Handling - a failing command halts the fatal stages

use crate::helpers::*;
use stagerun::core::{PipelineError, StageName};
use std::sync::Arc;

/// Script exits 1: the build fails, but after_success still runs its teardown
#[tokio::test]
async fn test_script_failure_still_runs_after_success() {
    let yaml = r#"
name: "Test: Script Failure"
install: [ "pip install ." ]
script: [ "coverage run setup.py test" ]
after_success: [ "docker-compose down" ]
after_failure: [ "cat test.log" ]
"#;

    let executor = MockExecutor::failing(&[("coverage run setup.py test", 1)]);
    let result = run_pipeline_with_mock(
        pipeline_from_yaml(yaml),
        executor.clone(),
        Arc::new(ReadyAfter::new(0)),
        None,
    )
    .await;

    assert!(result.is_failed());
    assert_eq!(result.pipeline.state.status.exit_code(), 1);
    assert_stage_failed(&result, StageName::Script, "with code 1");
    assert_stage_completed(&result, StageName::AfterSuccess);
    assert_stage_completed(&result, StageName::AfterFailure);
    assert!(executor.was_called("docker-compose down"));
    assert!(executor.was_called("cat test.log"));

    match &result.result {
        Err(PipelineError::Execution {
            command,
            exit_code,
            stderr,
        }) => {
            assert_eq!(command, "coverage run setup.py test");
            assert_eq!(*exit_code, 1);
            assert!(stderr.contains("failed"));
        }
        other => panic!("expected an execution error, got {:?}", other),
    }
}

/// A failing install command stops the stage and skips the script
#[tokio::test]
async fn test_install_failure_skips_remaining_stages() {
    let yaml = r#"
name: "Test: Install Failure"
before_install: [ "apt-get update" ]
install:
  - pip install -r requirements.txt
  - pip install coveralls
script: [ "pytest" ]
"#;

    let executor = MockExecutor::failing(&[("pip install -r requirements.txt", 2)]);
    let result = run_pipeline_with_mock(
        pipeline_from_yaml(yaml),
        executor.clone(),
        Arc::new(ReadyAfter::new(0)),
        None,
    )
    .await;

    assert!(result.is_failed());
    assert_eq!(result.result.as_ref().unwrap_err().exit_code(), Some(2));
    assert_stage_completed(&result, StageName::BeforeInstall);
    assert_stage_failed(&result, StageName::Install, "with code 2");
    assert_stage_skipped(&result, StageName::Script);

    // the second install command never ran
    assert_eq!(
        executor.calls(),
        vec!["apt-get update", "pip install -r requirements.txt"]
    );
    assert_eq!(result.pipeline.state.failed_stages, 1);
}

/// Only the first fatal error is reported
#[tokio::test]
async fn test_first_error_wins() {
    let yaml = r#"
name: "Test: First Error"
before_install: [ "false" ]
script: [ "pytest" ]
after_success: [ "false" ]
"#;

    let executor = MockExecutor::failing(&[("false", 1)]);
    let result = run_pipeline_with_mock(
        pipeline_from_yaml(yaml),
        executor.clone(),
        Arc::new(ReadyAfter::new(0)),
        None,
    )
    .await;

    assert!(result.is_failed());
    assert_stage_failed(&result, StageName::BeforeInstall, "false");
    assert_stage_failed(&result, StageName::AfterSuccess, "false");
    assert!(!executor.was_called("pytest"));
    assert!(matches!(
        result.result,
        Err(PipelineError::Execution { ref command, .. }) if command == "false"
    ));
}
