//! CLI output formatting

use crate::{
    core::ExecutionStatus,
    execution::ExecutionEvent,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");

/// Create a spinner shown while waiting on a service
pub fn create_service_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
        spinner.set_style(template);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

/// Format an execution event for display
///
/// Returns `None` for events that only matter to the streaming view.
pub fn format_execution_event(event: &ExecutionEvent) -> Option<String> {
    let line = match event {
        ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name,
        } => format!(
            "{} Starting pipeline {} ({})",
            ROCKET,
            style(pipeline_name).bold(),
            style(&execution_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::ServicesStarting { count } => {
            format!("{} Starting {} service(s)", INFO, style(count).cyan())
        }
        ExecutionEvent::ServiceWaiting { .. } => return None,
        ExecutionEvent::ServiceReady {
            service,
            attempts,
            elapsed,
        } => format!(
            "{} {} ready ({} attempt(s), {})",
            CHECK,
            style(service).green(),
            attempts,
            style(format_duration(*elapsed)).dim()
        ),
        ExecutionEvent::ServiceUnavailable { service, error } => {
            format!("{} {}: {}", CROSS, style(service).red(), style(error).dim())
        }
        ExecutionEvent::StageStarted { stage, commands } => format!(
            "{} {} ({} command(s))",
            SPINNER,
            style(stage).cyan(),
            commands
        ),
        ExecutionEvent::CommandStarted { command, .. } => {
            format!("  {} {}", style("$").dim(), command)
        }
        ExecutionEvent::CommandFinished { .. } => return None,
        ExecutionEvent::CommandFailed { command, error, .. } => format!(
            "  {} {}: {}",
            CROSS,
            style(command).red(),
            style(error).dim()
        ),
        ExecutionEvent::StageCompleted { stage } => {
            format!("{} {}", CHECK, style(stage).green())
        }
        ExecutionEvent::StageFailed {
            stage,
            error,
            best_effort,
        } => {
            if *best_effort {
                format!(
                    "{} {} failed, continuing: {}",
                    WARN,
                    style(stage).yellow(),
                    style(error).dim()
                )
            } else {
                format!("{} {}: {}", CROSS, style(stage).red(), style(error).dim())
            }
        }
        ExecutionEvent::StageSkipped { stage, reason } => {
            format!("{} {} ({})", SKIP, style(stage).dim(), style(reason).dim())
        }
        ExecutionEvent::ReportSubmitted => format!("{} Coverage report submitted", CHECK),
        ExecutionEvent::ReportFailed { error } => format!(
            "{} Coverage report not submitted: {}",
            WARN,
            style(error).dim()
        ),
        ExecutionEvent::ServiceTeardownFailed { service, error } => format!(
            "{} Teardown of {} failed: {}",
            WARN,
            style(service).yellow(),
            style(error).dim()
        ),
        ExecutionEvent::PipelineCompleted {
            execution_id,
            status,
        } => {
            let status_str = match status {
                ExecutionStatus::Completed => {
                    format!("{} completed", style("successfully").green())
                }
                ExecutionStatus::Failed => style("failed").red().to_string(),
                other => format_status(*other),
            };
            format!(
                "{} Pipeline ({}) {}",
                INFO,
                style(&execution_id.to_string()[..8]).dim(),
                status_str
            )
        }
    };
    Some(line)
}

/// Format command output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.trim_end().to_string()
    } else {
        let truncated = lines[..max_lines].join("\n");
        format!(
            "{}\n{}... ({} more lines)",
            truncated,
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}
