use anyhow::{Context, Result};
use stagerun::cli::commands::{PlanCommand, RunCommand, ValidateCommand};
use stagerun::cli::output::*;
use stagerun::cli::terminal_output::TerminalOutput;
use stagerun::cli::{Cli, Command};
use stagerun::core::config::PipelineConfig;
use stagerun::core::ExecutionStatus;
use stagerun::execution::{ExecutionEngine, ResultReporter};
use stagerun::process::ProcessExecutor;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd, cli.stream).await,
        Command::Validate(cmd) => validate_pipeline(cmd),
        Command::Plan(cmd) => plan_pipeline(cmd),
    };

    match result {
        Ok(status) => ExitCode::from(status.exit_code() as u8),
        Err(e) => {
            println!("{} {}", CROSS, style(format!("{:#}", e)).red());
            ExitCode::FAILURE
        }
    }
}

async fn run_pipeline(cmd: &RunCommand, stream: bool) -> Result<ExecutionStatus> {
    let config = PipelineConfig::from_file(&cmd.file).context("Failed to load pipeline config")?;

    println!("{} Loaded pipeline: {}", INFO, style(&config.name).bold());

    let mut pipeline = config.to_pipeline()?;

    // Apply environment overrides
    for (key, value) in &cmd.env {
        pipeline.env.insert(key.clone(), value.clone());
        println!(
            "{} Environment override: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
    }

    let mut engine = ExecutionEngine::system(ProcessExecutor::new(cmd.executor_config()))
        .context("Failed to set up readiness probes")?;

    match (&config.coverage, cmd.no_report) {
        (Some(coverage), false) => {
            let mut reporter =
                ResultReporter::from_config(coverage).context("Failed to set up reporter")?;
            if let Some(dir) = &cmd.workdir {
                reporter = reporter.with_base_dir(dir);
            }
            engine = engine.with_reporter(reporter);
        }
        (Some(_), true) => println!("{} Coverage reporting disabled", INFO),
        (None, _) => {}
    }

    let output = Arc::new(TerminalOutput::new(stream, pipeline.stages.len()));
    engine.add_event_handler(move |event| output.on_event(&event));

    println!();
    let result = engine.execute(&mut pipeline).await;

    for warning in &pipeline.state.warnings {
        println!("{} {}", WARN, style(warning).yellow());
    }

    if let Some(duration) = pipeline
        .state
        .started_at
        .zip(pipeline.state.completed_at)
        .and_then(|(start, end)| end.signed_duration_since(start).to_std().ok())
    {
        println!("{} Finished in {}", INFO, style(format_duration(duration)).dim());
    }

    match result {
        Ok(()) => println!(
            "\n{} {} completed {}",
            CHECK,
            style(&pipeline.name).bold(),
            style("successfully").green()
        ),
        Err(e) => {
            error!("{}", e);
            println!(
                "\n{} {} {}: {}",
                CROSS,
                style(&pipeline.name).bold(),
                style("failed").red(),
                e
            );
        }
    }

    Ok(pipeline.state.status)
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<ExecutionStatus> {
    println!("{} Validating pipeline...", INFO);

    match PipelineConfig::from_file(&cmd.file) {
        Ok(config) => {
            println!("{} Pipeline configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Services: {}", style(config.services.len()).cyan());
            println!("  Script commands: {}", style(config.script.len()).cyan());
            println!("  Environment: {}", style(config.get_env()?.len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(ExecutionStatus::Completed)
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            Ok(ExecutionStatus::Failed)
        }
    }
}

fn plan_pipeline(cmd: &PlanCommand) -> Result<ExecutionStatus> {
    let config = PipelineConfig::from_file(&cmd.file).context("Failed to load pipeline config")?;
    let pipeline = config.to_pipeline()?;
    // process env stays out of the printed plan
    let context = pipeline.create_isolated_context(None);

    println!("{} Plan for {}", INFO, style(&pipeline.name).bold());

    for service in &pipeline.services {
        println!(
            "\n  {} {} (ready: {}, timeout {}s, every {}s)",
            style("service").dim(),
            style(&service.name).cyan(),
            service.readiness.describe(),
            service.timeout.as_secs(),
            service.interval.as_secs()
        );
        if let Some(start) = &service.start {
            println!("    start: {:?}", start.render(&context));
        }
        if let Some(stop) = &service.stop {
            println!("    stop:  {:?}", stop.render(&context));
        }
    }

    for stage in &pipeline.stages {
        let marker = if stage.continue_on_failure { " (best-effort)" } else { "" };
        println!("\n  {}{}", style(stage.name).bold(), style(marker).dim());
        let stage_context = pipeline.create_isolated_context(Some(stage.name));
        for command in &stage.commands {
            println!("    {:?}", command.render(&stage_context));
        }
    }

    if let Some(coverage) = &config.coverage {
        println!(
            "\n  {} {} -> {}",
            style("report").dim(),
            coverage.artifact,
            coverage.endpoint
        );
    }

    Ok(ExecutionStatus::Completed)
}
