//! Test: Success Chain - every stage passes and runs in order

use crate::helpers::*;
use stagerun::core::{ExecutionStatus, StageName};
use std::sync::Arc;

#[tokio::test]
async fn test_install_then_script() {
    let yaml = r#"
name: "Test: Install Then Script"
install:
  - pip install -r requirements.txt
  - pip install coveralls
script:
  - coverage run setup.py test
"#;

    let executor = MockExecutor::new();
    let result = run_pipeline_with_mock(
        pipeline_from_yaml(yaml),
        executor.clone(),
        Arc::new(ReadyAfter::new(0)),
        None,
    )
    .await;

    assert!(result.is_success());
    assert_stage_completed(&result, StageName::Install);
    assert_stage_completed(&result, StageName::Script);
    assert_eq!(
        executor.calls(),
        vec![
            "pip install -r requirements.txt",
            "pip install coveralls",
            "coverage run setup.py test",
        ]
    );
}

#[tokio::test]
async fn test_all_stages_in_fixed_order() {
    let yaml = r#"
name: "Test: Stage Order"
after_success: [ "echo done" ]
script: [ "pytest" ]
install: [ "pip install ." ]
before_install: [ "pip install -U pip" ]
after_failure: [ "cat log.txt" ]
"#;

    let executor = MockExecutor::new();
    let result = run_pipeline_with_mock(
        pipeline_from_yaml(yaml),
        executor.clone(),
        Arc::new(ReadyAfter::new(0)),
        None,
    )
    .await;

    assert!(result.is_success());
    assert_eq!(
        result.started_stages(),
        vec![
            StageName::BeforeInstall,
            StageName::Install,
            StageName::Script,
            StageName::AfterSuccess,
        ]
    );
    assert_stage_skipped(&result, StageName::AfterFailure);
    assert!(!executor.was_called("cat log.txt"));

    assert_eq!(result.pipeline.state.status, ExecutionStatus::Completed);
    assert_eq!(result.pipeline.state.total_stages, 5);
    assert_eq!(result.pipeline.state.completed_stages, 4);
    assert_eq!(result.pipeline.state.failed_stages, 0);
    assert!(result.pipeline.state.completed_at.is_some());
}

#[tokio::test]
async fn test_commands_are_expanded_from_pipeline_env() {
    let yaml = r#"
name: "Test: Expansion"
env:
  NEO4J_HOST: db.local
script:
  - [ "pytest", "--host", "${NEO4J_HOST}" ]
  - echo '$NEO4J_HOST' "$NEO4J_HOST:7474"
"#;

    let executor = MockExecutor::new();
    let result = run_pipeline_with_mock(
        pipeline_from_yaml(yaml),
        executor.clone(),
        Arc::new(ReadyAfter::new(0)),
        None,
    )
    .await;

    assert!(result.is_success());
    assert_eq!(
        executor.calls(),
        vec!["pytest --host db.local", "echo $NEO4J_HOST db.local:7474"]
    );
}
