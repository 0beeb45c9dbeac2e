//! Terminal rendering of execution events
//!
//! Turns the engine's [`ExecutionEvent`]s into console output:
//!
//! - Stage headers with progress indicators: `[2/4] install`
//! - A spinner while a service is being probed
//! - Captured command output when streaming is enabled
//!
//! # Example
//!
//! ```no_run
//! use stagerun::cli::terminal_output::TerminalOutput;
//! use stagerun::execution::ExecutionEvent;
//!
//! let output = TerminalOutput::new(true, 3);
//! output.on_event(&ExecutionEvent::ReportSubmitted);
//! ```

use crate::cli::output::{create_service_spinner, format_execution_event, format_output, style};
use crate::execution::ExecutionEvent;
use indicatif::ProgressBar;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Lines of captured output shown per command
const MAX_OUTPUT_LINES: usize = 20;

/// Prints execution events as they arrive
#[derive(Debug)]
pub struct TerminalOutput {
    stream: bool,
    stage_number: AtomicUsize,
    total_stages: usize,
    spinner: Mutex<Option<ProgressBar>>,
}

impl TerminalOutput {
    /// Create a new terminal output
    ///
    /// * `stream` - Whether to print the captured output of each command
    /// * `total_stages` - Number of declared stages, for the header display
    pub fn new(stream: bool, total_stages: usize) -> Self {
        Self {
            stream,
            stage_number: AtomicUsize::new(0),
            total_stages,
            spinner: Mutex::new(None),
        }
    }

    /// Print a stage header
    ///
    /// Format: `[N/M] stage`
    fn print_stage_header(&self, stage_name: &str) {
        let number = self.stage_number.fetch_add(1, Ordering::SeqCst) + 1;
        self.print_separator();
        println!(
            "[{}/{}] {}",
            style(number).cyan(),
            style(self.total_stages).dim(),
            style(stage_name).bold()
        );
    }

    /// A horizontal rule spanning the terminal width
    fn print_separator(&self) {
        // Get terminal width, default to 80 if unavailable
        let width = term_size::dimensions_stdout()
            .map(|(w, _)| w)
            .unwrap_or(80);
        println!("{}", style("─".repeat(width)).dim());
    }

    fn print_captured(&self, stdout: &str, stderr: &str) {
        if !stdout.trim().is_empty() {
            println!("{}", format_output(stdout, MAX_OUTPUT_LINES));
        }
        if !stderr.trim().is_empty() {
            println!("{}", style(format_output(stderr, MAX_OUTPUT_LINES)).red());
        }
    }

    fn start_spinner(&self, message: String) {
        if let Ok(mut spinner) = self.spinner.lock() {
            if let Some(previous) = spinner.take() {
                previous.finish_and_clear();
            }
            *spinner = Some(create_service_spinner(message));
        }
    }

    fn stop_spinner(&self) {
        if let Ok(mut spinner) = self.spinner.lock() {
            if let Some(spinner) = spinner.take() {
                spinner.finish_and_clear();
            }
        }
    }

    /// Flush stdout to ensure immediate display
    fn flush_stdout(&self) {
        let _ = io::stdout().flush();
    }

    pub fn on_event(&self, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::ServiceWaiting {
                service,
                probe,
                timeout,
            } => {
                self.start_spinner(format!(
                    "Waiting for {} ({}, up to {}s)",
                    service,
                    probe,
                    timeout.as_secs()
                ));
                return;
            }
            ExecutionEvent::ServiceReady { .. } | ExecutionEvent::ServiceUnavailable { .. } => {
                self.stop_spinner();
            }
            ExecutionEvent::StageStarted { stage, .. } => {
                self.print_stage_header(stage.as_str());
            }
            _ => {}
        }

        if let Some(line) = format_execution_event(event) {
            println!("{}", line);
        }

        if self.stream {
            match event {
                ExecutionEvent::CommandFinished { record, .. } => {
                    self.print_captured(&record.stdout, &record.stderr);
                }
                ExecutionEvent::CommandFailed {
                    record: Some(record),
                    ..
                } => {
                    self.print_captured(&record.stdout, &record.stderr);
                }
                _ => {}
            }
        }

        self.flush_stdout();
    }
}
